// Per-job rendezvous: tells the worker where to write its URL, then waits for it.

use log::debug;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::rendezvous::{self, url_file_name};
use crate::Error;
use crate::RENDEZVOUS_DIR_KEY;

/// Produces the environment a worker needs to report its URL back, then
/// blocks until it has done so.
///
/// State machine: `Initialized -> InitMessageDelivered -> Waiting ->
/// UrlRead -> Released`. The object is terminal on any exit path: once
/// dropped, its rendezvous file (if any was read) is removed.
pub trait JobCommunicator: Send {
    /// The environment variables to inject into the job so its worker knows
    /// where to write its URL file.
    fn get_init_message(&self) -> BTreeMap<String, String>;

    /// Block until the worker for `job_id` has written its URL, then return it.
    ///
    /// # Errors
    /// Returns [`Error::FileRead`] if the rendezvous file cannot be opened
    /// once it appears.
    fn get_model_url(&mut self, job_id: &str) -> Result<String, Error>;
}

/// Creates one [`JobCommunicator`] per job.
///
/// A fresh communicator is paired with every submission *before* the submit
/// command runs, so the worker can never write its URL before the gateway
/// is ready to look for it.
pub trait JobCommunicatorFactory: Send + Sync {
    fn create(&self) -> Box<dyn JobCommunicator>;
}

/// Creates [`FileJobCommunicator`]s rooted at a shared rendezvous directory.
pub struct FileCommunicatorFactory {
    dir: PathBuf,
    poll_interval: Duration,
}

impl FileCommunicatorFactory {
    /// Ensure `dir` exists and build a factory that hands out communicators
    /// rooted there.
    ///
    /// # Errors
    /// Returns [`Error::DirectoryCreate`] if `dir` cannot be created.
    pub fn new(dir: PathBuf, poll_interval: Duration) -> Result<Self, Error> {
        std::fs::create_dir_all(&dir).map_err(|e| Error::DirectoryCreate(dir.clone(), e))?;
        Ok(Self { dir, poll_interval })
    }
}

impl JobCommunicatorFactory for FileCommunicatorFactory {
    fn create(&self) -> Box<dyn JobCommunicator> {
        Box::new(FileJobCommunicator {
            dir: self.dir.clone(),
            poll_interval: self.poll_interval,
            url_path: None,
        })
    }
}

/// Rendezvous over a shared directory: the worker writes `url-<jobId>.txt`,
/// the gateway polls for it.
pub struct FileJobCommunicator {
    dir: PathBuf,
    poll_interval: Duration,
    url_path: Option<PathBuf>,
}

impl JobCommunicator for FileJobCommunicator {
    fn get_init_message(&self) -> BTreeMap<String, String> {
        let mut message = BTreeMap::new();
        message.insert(
            RENDEZVOUS_DIR_KEY.to_string(),
            self.dir.to_string_lossy().to_string(),
        );
        message
    }

    fn get_model_url(&mut self, job_id: &str) -> Result<String, Error> {
        let path = self.dir.join(url_file_name(job_id));
        debug!("Waiting for URL file '{}'.", path.display());
        rendezvous::wait_for_file(&path, self.poll_interval);
        let url = rendezvous::read_single_line(&path)?;
        self.url_path = Some(path);
        Ok(url)
    }
}

impl Drop for FileJobCommunicator {
    fn drop(&mut self) {
        if let Some(path) = self.url_path.take() {
            debug!("Removing rendezvous file '{}'.", path.display());
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn init_message_carries_rendezvous_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let factory = FileCommunicatorFactory::new(dir.clone(), Duration::from_millis(10)).unwrap();
        let comm = factory.create();
        let message = comm.get_init_message();
        assert_eq!(
            message.get(RENDEZVOUS_DIR_KEY).unwrap(),
            &dir.to_string_lossy().to_string()
        );
    }

    #[test]
    fn url_file_removed_after_drop() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let factory = FileCommunicatorFactory::new(dir, Duration::from_millis(5)).unwrap();
        let mut comm = factory.create();

        let file = temp.child("url-99.txt");
        file.write_str("http://127.0.0.1:8000\n").unwrap();

        let url = comm.get_model_url("99").expect("url readable");
        assert_eq!(url, "http://127.0.0.1:8000");
        file.assert(predicates::path::exists());

        drop(comm);
        file.assert(predicates::path::missing());
    }
}
