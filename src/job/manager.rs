// Composes a JobSubmitter, JobCommunicatorFactory, and JobScriptLocator into
// the single operation the rest of the gateway needs: a bound worker.

use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::job::communicator::JobCommunicator;
use crate::job::{JobCommunicatorFactory, JobHandle, JobScriptLocator, JobSubmitter};
use crate::worker::WorkerClient;
use crate::Error;

/// The composite `{job, worker client}` owned by one inbound operation.
///
/// Dropping a `WorkerBinding` -- normally or while unwinding from an error --
/// cancels its job and removes its rendezvous file, in that order.
pub struct WorkerBinding {
    _job: JobHandle,
    _communicator: Box<dyn JobCommunicator>,
    pub client: WorkerClient,
    pub model_name: String,
}

#[cfg(test)]
impl WorkerBinding {
    /// Build a binding around an already-running worker, skipping real job
    /// submission and rendezvous. For exercising the proxy and server layers
    /// against a fake worker without a scheduler.
    pub(crate) fn for_test(client: WorkerClient, model_name: String) -> Self {
        use crate::command::CommandRunner;
        use crate::job::SchedulerKind;
        use std::collections::BTreeMap;

        struct NoopRunner;
        impl CommandRunner for NoopRunner {
            fn run(&self, _cmdline: &str) -> Result<String, Error> {
                Ok(String::new())
            }
        }

        struct NoopCommunicator;
        impl JobCommunicator for NoopCommunicator {
            fn get_init_message(&self) -> BTreeMap<String, String> {
                BTreeMap::new()
            }

            fn get_model_url(&mut self, _job_id: &str) -> Result<String, Error> {
                Ok(String::new())
            }
        }

        let job = JobHandle::new(
            "test-job".into(),
            SchedulerKind::Batch,
            Arc::new(NoopRunner),
            String::new(),
            String::new(),
        );

        Self {
            _job: job,
            _communicator: Box::new(NoopCommunicator),
            client,
            model_name,
        }
    }
}

/// Grants exclusive, transient access to a freshly allocated worker.
#[async_trait]
pub trait JobManager: Send + Sync {
    /// Submit a job for `model_name`, wait for its worker to report in, and
    /// return a binding to it.
    async fn request_model_access(&self, model_name: &str) -> Result<WorkerBinding, Error>;

    /// The model names served by the worker image, queried once via a
    /// transient worker launched from the default job script.
    async fn get_model_names(&self) -> Result<Vec<String>, Error>;
}

/// The concrete [`JobManager`]: submits through a [`JobSubmitter`],
/// rendezvous through a [`JobCommunicatorFactory`], and resolves scripts
/// through a [`JobScriptLocator`].
///
/// Stateless across calls except for the submitter's own pacing lock and
/// counter; this struct itself holds no per-request mutable state, so
/// concurrent calls to `request_model_access` proceed independently.
pub struct CommandJobManager {
    submitter: Arc<JobSubmitter>,
    communicator_factory: Arc<dyn JobCommunicatorFactory>,
    locator: Arc<JobScriptLocator>,
    model_names: OnceCell<Vec<String>>,
}

impl CommandJobManager {
    pub fn new(
        submitter: Arc<JobSubmitter>,
        communicator_factory: Arc<dyn JobCommunicatorFactory>,
        locator: Arc<JobScriptLocator>,
    ) -> Self {
        Self {
            submitter,
            communicator_factory,
            locator,
            model_names: OnceCell::new(),
        }
    }

    async fn acquire(&self, model_name: &str, script: PathBuf) -> Result<WorkerBinding, Error> {
        let mut comm = self.communicator_factory.create();
        let init = comm.get_init_message();

        let submitter = self.submitter.clone();
        let model_owned = model_name.to_string();
        let job = tokio::task::spawn_blocking(move || submitter.submit(&model_owned, &script, &init))
            .await
            .expect("submit task did not panic")?;

        let job_id = job.job_id().to_string();
        debug!("Waiting for worker of job '{job_id}' to report its URL.");
        let (comm, url) = tokio::task::spawn_blocking(move || {
            comm.get_model_url(&job_id).map(|url| (comm, url))
        })
        .await
        .expect("rendezvous task did not panic")?;

        let client = WorkerClient::new(&url, model_name);

        Ok(WorkerBinding {
            _job: job,
            _communicator: comm,
            client,
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl JobManager for CommandJobManager {
    async fn request_model_access(&self, model_name: &str) -> Result<WorkerBinding, Error> {
        let script = self.locator.select_script(model_name)?;
        self.acquire(model_name, script).await
    }

    async fn get_model_names(&self) -> Result<Vec<String>, Error> {
        if let Some(names) = self.model_names.get() {
            return Ok(names.clone());
        }

        let script = self.locator.default_script();
        let binding = self.acquire("<enumeration>", script).await?;
        let names = binding.client.get_info().await?;

        // Another task may have raced us here; OnceCell keeps only the
        // first value, which is fine since every race queried the same
        // worker image.
        let _ = self.model_names.set(names.clone());
        Ok(names)
    }
}
