// Command line argument parsing for the gateway binary.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::job::SchedulerKind;
use crate::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT};

/// A load-balancing gateway that proxies `umbridge`-protocol model
/// evaluations onto workers launched through an HPC batch scheduler.
///
/// Presents the same `/Evaluate`-and-friends surface a single model server
/// would, but each inbound operation provisions its own scheduler job,
/// rendezvous with the worker it starts, proxies exactly one call, and
/// releases the allocation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Options {
    /// The scheduler backend to submit worker jobs to.
    #[arg(long, value_enum)]
    pub scheduler: SchedulerKind,

    /// Port to listen on. Overridden by the `PORT` environment variable.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Delay inserted between successive job submissions, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Number of scheduler-side server processes to start (`batch` only).
    #[arg(long, default_value_t = 1)]
    pub num_server: u32,

    /// Directory job scripts are read from.
    #[arg(long, default_value = "scripts")]
    pub script_dir: PathBuf,

    /// Default job script, used when a model has no dedicated script and to
    /// enumerate model names at startup.
    #[arg(long, default_value = "run-server.sh")]
    pub default_script: String,

    /// Prefix of a model-specific job script's file name.
    #[arg(long, default_value = "run-")]
    pub script_prefix: String,

    /// Suffix of a model-specific job script's file name.
    #[arg(long, default_value = ".sh")]
    pub script_suffix: String,

    /// Directory used for filesystem rendezvous between the gateway and
    /// freshly launched workers. Purged of stale `url-*.txt` files at
    /// startup.
    #[arg(long, default_value = "rendezvous")]
    pub rendezvous_dir: PathBuf,

    /// Interval between checks for a worker's URL file, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Command used to submit a batch-array job (Slurm-shaped).
    #[arg(long, default_value = "sbatch")]
    pub batch_submit: String,

    /// Command used to cancel a batch-array job.
    #[arg(long, default_value = "scancel")]
    pub batch_cancel: String,

    /// Command used to submit a task-queue job (HyperQueue-shaped).
    #[arg(long, default_value = "hq submit")]
    pub queue_submit: String,

    /// Command used to cancel a task-queue job.
    #[arg(long, default_value = "hq job cancel")]
    pub queue_cancel: String,

    /// Script that bootstraps the task-queue server and its allocation
    /// queue before any jobs are submitted to it (`queue` only).
    #[arg(long)]
    pub queue_bootstrap_script: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::WarnLevel>,
}

impl Options {
    /// The port to bind, honoring the `PORT` environment variable's
    /// precedence over `--port`.
    pub fn effective_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(self.port)
    }

    pub fn submission_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    fn options(args: &[&str]) -> Options {
        Options::parse_from(std::iter::once("umbridge-gateway").chain(args.iter().copied()))
    }

    #[test]
    #[serial]
    fn effective_port_defaults_to_the_flag() {
        std::env::remove_var("PORT");
        let options = options(&["--scheduler", "batch", "--port", "5050"]);
        assert_eq!(options.effective_port(), 5050);
    }

    #[test]
    #[serial]
    fn effective_port_env_var_overrides_the_flag() {
        std::env::set_var("PORT", "9090");
        let options = options(&["--scheduler", "batch", "--port", "5050"]);
        assert_eq!(options.effective_port(), 9090);
        std::env::remove_var("PORT");
    }
}
