#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![warn(clippy::format_push_string)]

pub mod cli;
pub mod command;
pub mod gateway;
pub mod job;
pub mod protocol;
pub mod rendezvous;
pub mod server;
pub mod worker;

use std::io;
use std::path::PathBuf;

/// The rendezvous key injected into every job's environment.
pub const RENDEZVOUS_DIR_KEY: &str = "UMBRIDGE_LOADBALANCER_COMM_FILEDIR";

/// Default polling interval used while waiting for a worker's URL file.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default port the gateway listens on.
pub const DEFAULT_PORT: u16 = 4242;

/// Errors that may be encountered while running the gateway.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("missing required argument: {0}")]
    ConfigError(String),

    // IO errors
    #[error("I/O error: {0}")]
    IO(#[from] io::Error),

    #[error("unable to read '{0}': {1}")]
    FileRead(PathBuf, #[source] io::Error),

    #[error("unable to write '{0}': {1}")]
    FileWrite(PathBuf, #[source] io::Error),

    #[error("unable to remove '{0}': {1}")]
    FileRemove(PathBuf, #[source] io::Error),

    #[error("unable to create directory '{0}': {1}")]
    DirectoryCreate(PathBuf, #[source] io::Error),

    #[error("unable to read directory '{0}': {1}")]
    DirectoryRead(PathBuf, #[source] io::Error),

    // Job submission errors
    #[error("unable to spawn '{0}': {1}")]
    SpawnFailed(String, #[source] io::Error),

    #[error("job submission for action '{0}' returned no job id")]
    SubmitFailed(String),

    #[error("no job script found for model '{0}': expected one at '{1}'")]
    ScriptMissing(String, PathBuf),

    #[error("timed out waiting for worker rendezvous file '{0}'")]
    RendezvousTimeout(PathBuf),

    // Worker protocol errors
    #[error("worker returned an unparsable response: {0}")]
    WorkerProtocolError(String),

    #[error("feature '{0}' is not supported by this model")]
    UnsupportedFeature(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    /// An error reported by a worker's `error` envelope, forwarded verbatim.
    #[error("{message}")]
    WorkerError { kind: String, message: String },

    #[error("request to worker failed: {0}")]
    WorkerRequestFailed(#[from] reqwest::Error),

    #[error("unable to serialize/deserialize JSON: {0}")]
    JSON(#[from] serde_json::Error),
}
