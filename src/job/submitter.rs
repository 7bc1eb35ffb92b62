// Translates a job script and environment into a scheduler submit command.

use log::debug;
use shell_quote::QuoteExt;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::command::CommandRunner;
use crate::job::{JobHandle, SchedulerKind};
use crate::Error;

/// Submits jobs to the configured scheduler and wraps the result as a
/// [`JobHandle`].
///
/// Holds the only gateway-level lock: an optional pacing mutex taken for
/// the duration of the inter-submission delay. A monotonically increasing
/// atomic counter orders submissions; for the `TaskQueue` backend this
/// counter becomes the (negated) queue priority, so earlier submissions
/// sort ahead of later ones.
pub struct JobSubmitter {
    kind: SchedulerKind,
    runner: Arc<dyn CommandRunner>,
    batch_submit: String,
    batch_cancel: String,
    queue_submit: String,
    queue_cancel: String,
    submission_delay: Duration,
    num_server: u32,
    pacing: Mutex<()>,
    submission_count: AtomicU64,
}

impl JobSubmitter {
    /// Construct a submitter for the given scheduler backend.
    ///
    /// `num_server` requests a Slurm-style job array of that size on every
    /// `batch` submission (`--array=0-N-1`), so a model's worker pool is
    /// sized independently of how many gateway operations happen to be
    /// in flight. Ignored for `queue`, which sizes its own pool elsewhere.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: SchedulerKind,
        runner: Arc<dyn CommandRunner>,
        batch_submit: String,
        batch_cancel: String,
        queue_submit: String,
        queue_cancel: String,
        submission_delay: Duration,
        num_server: u32,
    ) -> Self {
        Self {
            kind,
            runner,
            batch_submit,
            batch_cancel,
            queue_submit,
            queue_cancel,
            submission_delay,
            num_server,
            pacing: Mutex::new(()),
            submission_count: AtomicU64::new(0),
        }
    }

    /// Submit `script` with `env` injected into the job's environment.
    ///
    /// `model_name` is used only to label errors.
    ///
    /// # Errors
    /// Returns [`Error::SpawnFailed`] if the submit command cannot be
    /// launched, or [`Error::SubmitFailed`] if it ran but produced no job
    /// id (the scheduler may still have exited zero).
    pub fn submit(
        &self,
        model_name: &str,
        script: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<JobHandle, Error> {
        // The delay paces submissions *between* each other; the first
        // submission since process start never waits.
        if !self.submission_delay.is_zero() && self.submission_count.load(Ordering::SeqCst) > 0 {
            let _guard = self.pacing.lock().expect("pacing mutex is never poisoned");
            std::thread::sleep(self.submission_delay);
        }

        // Fetch-and-increment: the counter value used for this submission's
        // priority is claimed atomically, before the (possibly slow) submit
        // subprocess runs, so concurrent submissions are totally ordered by
        // arrival at this line.
        let count = self.submission_count.fetch_add(1, Ordering::SeqCst);

        let cmdline = match self.kind {
            SchedulerKind::Batch => self.batch_cmdline(script, env),
            SchedulerKind::Queue => self.queue_cmdline(script, env, count),
        };

        let output = self.runner.run(&cmdline)?;

        let job_id = match self.kind {
            // sbatch --parsable prints "<id>[;<cluster>]\n".
            SchedulerKind::Batch => output
                .trim_end()
                .split(';')
                .next()
                .unwrap_or("")
                .to_string(),
            SchedulerKind::Queue => output.trim_end().to_string(),
        };

        if job_id.is_empty() {
            return Err(Error::SubmitFailed(model_name.to_string()));
        }

        debug!("Submitted job '{job_id}' for model '{model_name}' (priority rank {count}).");

        Ok(JobHandle::new(
            job_id,
            self.kind,
            self.runner.clone(),
            self.batch_cancel.clone(),
            self.queue_cancel.clone(),
        ))
    }

    fn batch_cmdline(&self, script: &Path, env: &BTreeMap<String, String>) -> String {
        let mut export = String::from("ALL");
        for (key, value) in env {
            let _ = write!(export, ",{key}={value}");
        }

        let mut cmdline = String::new();
        cmdline.push_str(&self.batch_submit);
        cmdline.push_str(" --parsable");
        if self.num_server > 1 {
            let _ = write!(cmdline, " --array=0-{}", self.num_server - 1);
        }
        cmdline.push_str(" --export=");
        cmdline.push_quoted(shell_quote::Bash, &export);
        cmdline.push(' ');
        cmdline.push_quoted(shell_quote::Bash, &script.to_string_lossy());
        cmdline
    }

    fn queue_cmdline(&self, script: &Path, env: &BTreeMap<String, String>, count: u64) -> String {
        let mut cmdline = String::new();
        cmdline.push_str(&self.queue_submit);
        let _ = write!(cmdline, " --output-mode=quiet --priority=-{count}");
        for (key, value) in env {
            cmdline.push_str(" --env ");
            cmdline.push_quoted(shell_quote::Bash, &format!("{key}={value}"));
        }
        cmdline.push(' ');
        cmdline.push_quoted(shell_quote::Bash, &script.to_string_lossy());
        cmdline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingRunner {
        calls: StdMutex<Vec<String>>,
        replies: StdMutex<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, cmdline: &str) -> Result<String, Error> {
            self.calls.lock().unwrap().push(cmdline.to_string());
            let mut replies = self.replies.lock().unwrap();
            Ok(if replies.is_empty() {
                String::new()
            } else {
                replies.remove(0)
            })
        }
    }

    fn env_with_dir(dir: &str) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("UMBRIDGE_LOADBALANCER_COMM_FILEDIR".to_string(), dir.to_string());
        env
    }

    #[test]
    fn batch_submission_parses_parsable_output() {
        let runner = Arc::new(RecordingRunner::default());
        runner.replies.lock().unwrap().push("12345;cluster0\n".into());
        let submitter = JobSubmitter::new(
            SchedulerKind::Batch,
            runner.clone(),
            "sbatch".into(),
            "scancel".into(),
            "hq submit".into(),
            "hq job cancel".into(),
            Duration::ZERO,
            1,
        );

        let handle = submitter
            .submit("forward", &PathBuf::from("/scripts/forward.sh"), &env_with_dir("/tmp/rv"))
            .expect("submit succeeds");

        assert_eq!(handle.job_id(), "12345");
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("sbatch --parsable --export="));
        assert!(calls[0].contains("UMBRIDGE_LOADBALANCER_COMM_FILEDIR=/tmp/rv"));
    }

    #[test]
    fn empty_job_id_is_submit_failed() {
        let runner = Arc::new(RecordingRunner::default());
        runner.replies.lock().unwrap().push(String::new());
        let submitter = JobSubmitter::new(
            SchedulerKind::Batch,
            runner,
            "sbatch".into(),
            "scancel".into(),
            "hq submit".into(),
            "hq job cancel".into(),
            Duration::ZERO,
            1,
        );

        let result = submitter.submit("forward", &PathBuf::from("script.sh"), &BTreeMap::new());
        assert!(matches!(result, Err(Error::SubmitFailed(name)) if name == "forward"));
    }

    #[test]
    fn num_server_above_one_requests_a_job_array() {
        let runner = Arc::new(RecordingRunner::default());
        runner.replies.lock().unwrap().push("777\n".into());
        let submitter = JobSubmitter::new(
            SchedulerKind::Batch,
            runner.clone(),
            "sbatch".into(),
            "scancel".into(),
            "hq submit".into(),
            "hq job cancel".into(),
            Duration::ZERO,
            4,
        );

        submitter
            .submit("forward", &PathBuf::from("script.sh"), &BTreeMap::new())
            .expect("submit succeeds");

        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].contains("--array=0-3"));
    }

    #[test]
    fn queue_priority_strictly_decreases_with_submission_order() {
        let runner = Arc::new(RecordingRunner::default());
        for id in ["1", "2", "3"] {
            runner.replies.lock().unwrap().push(format!("{id}\n"));
        }
        let submitter = JobSubmitter::new(
            SchedulerKind::Queue,
            runner.clone(),
            "sbatch".into(),
            "scancel".into(),
            "hq submit".into(),
            "hq job cancel".into(),
            Duration::ZERO,
            1,
        );

        for _ in 0..3 {
            submitter
                .submit("forward", &PathBuf::from("script.sh"), &BTreeMap::new())
                .expect("submit succeeds");
        }

        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].contains("--priority=-0"));
        assert!(calls[1].contains("--priority=-1"));
        assert!(calls[2].contains("--priority=-2"));
    }

    #[test]
    fn pacing_delay_separates_successive_submissions() {
        let runner = Arc::new(RecordingRunner::default());
        for _ in 0..3 {
            runner.replies.lock().unwrap().push("1\n".into());
        }
        let submitter = JobSubmitter::new(
            SchedulerKind::Queue,
            runner,
            "sbatch".into(),
            "scancel".into(),
            "hq submit".into(),
            "hq job cancel".into(),
            Duration::from_millis(50),
            1,
        );

        let start = Instant::now();
        for _ in 0..3 {
            submitter
                .submit("forward", &PathBuf::from("script.sh"), &BTreeMap::new())
                .expect("submit succeeds");
        }

        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
