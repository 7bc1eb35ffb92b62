// Job submission, rendezvous, and lifetime management for HPC-scheduled workers.

pub mod communicator;
pub mod handle;
pub mod manager;
pub mod script_locator;
pub mod submitter;

pub use communicator::{FileCommunicatorFactory, FileJobCommunicator, JobCommunicator};
pub use handle::JobHandle;
pub use manager::{CommandJobManager, JobManager, WorkerBinding};
pub use script_locator::JobScriptLocator;
pub use submitter::JobSubmitter;

use clap::ValueEnum;

/// The two HPC scheduler backends the gateway can submit to.
///
/// `BatchArray` models array-batch schedulers such as Slurm: a single
/// submission produces one numeric job id immediately, and jobs are
/// prioritized by the scheduler's own queue policy. `TaskQueue` models
/// lightweight task-queue schedulers such as HyperQueue: submissions accept
/// an explicit priority, used here to keep earlier submissions ahead of
/// later ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lower")]
pub enum SchedulerKind {
    /// Batch-array scheduler (Slurm-shaped: `sbatch --parsable`, `scancel`).
    Batch,
    /// Task-queue scheduler (HyperQueue-shaped: `--priority=-N`, job cancel).
    Queue,
}
