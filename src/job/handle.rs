// An opaque owner of one scheduler-side resource allocation.

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::command::CommandRunner;
use crate::job::SchedulerKind;

/// Owns one live job allocation on the HPC scheduler.
///
/// `JobHandle` cancels its allocation exactly once, on drop. It cannot be
/// cloned: ownership moves explicitly from the [`JobSubmitter`] that creates
/// it, through the [`JobManager`], into the [`WorkerBinding`] that proxies
/// one operation, and is released when that binding's scope exits.
///
/// [`JobSubmitter`]: crate::job::JobSubmitter
/// [`JobManager`]: crate::job::JobManager
/// [`WorkerBinding`]: crate::job::WorkerBinding
pub struct JobHandle {
    job_id: String,
    kind: SchedulerKind,
    runner: Arc<dyn CommandRunner>,
    batch_cancel: String,
    queue_cancel: String,
    cancelled: AtomicBool,
}

impl JobHandle {
    /// Construct a handle for an already-submitted job.
    pub(crate) fn new(
        job_id: String,
        kind: SchedulerKind,
        runner: Arc<dyn CommandRunner>,
        batch_cancel: String,
        queue_cancel: String,
    ) -> Self {
        Self {
            job_id,
            kind,
            runner,
            batch_cancel,
            queue_cancel,
            cancelled: AtomicBool::new(false),
        }
    }

    /// The scheduler-assigned job id.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Cancel the allocation now, rather than waiting for drop.
    ///
    /// Idempotent: calling this more than once, or calling it and then
    /// letting the handle drop, runs the cancel command exactly once.
    /// Best-effort: a failure to cancel is logged, not propagated, because
    /// by the time cancellation runs the caller has already received (or
    /// given up on) its result.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        let cmdline = match self.kind {
            SchedulerKind::Batch => format!("{} {}", self.batch_cancel, self.job_id),
            SchedulerKind::Queue => format!("{} {}", self.queue_cancel, self.job_id),
        };

        debug!("Cancelling job '{}'.", self.job_id);
        if let Err(error) = self.runner.run(&cmdline) {
            warn!("Failed to cancel job '{}': {error}", self.job_id);
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, cmdline: &str) -> Result<String, Error> {
            self.calls.lock().unwrap().push(cmdline.to_string());
            Ok(String::new())
        }
    }

    #[test]
    fn cancels_exactly_once_on_drop() {
        let runner = Arc::new(RecordingRunner::default());
        {
            let handle = JobHandle::new(
                "123".into(),
                SchedulerKind::Batch,
                runner.clone(),
                "scancel".into(),
                "hq job cancel".into(),
            );
            drop(handle);
        }
        assert_eq!(*runner.calls.lock().unwrap(), vec!["scancel 123"]);
    }

    #[test]
    fn explicit_cancel_then_drop_runs_once() {
        let runner = Arc::new(RecordingRunner::default());
        let handle = JobHandle::new(
            "7".into(),
            SchedulerKind::Queue,
            runner.clone(),
            "scancel".into(),
            "hq job cancel".into(),
        );
        handle.cancel();
        handle.cancel();
        drop(handle);
        assert_eq!(*runner.calls.lock().unwrap(), vec!["hq job cancel 7"]);
    }
}
