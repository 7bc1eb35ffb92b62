// Executes scheduler submission and cancellation commands and captures their output.

use log::trace;
use std::process::{Command, Stdio};
use std::str;

use crate::Error;

/// Runs a shell command line and captures its standard output.
///
/// `CommandRunner` is deliberately thin: it does not inspect the exit
/// status. HPC schedulers routinely exit zero on accepted submissions even
/// when the submission itself failed downstream, so callers detect failure
/// by parsing the captured output (an empty job id, a missing rendezvous
/// file) rather than by trusting the exit code.
pub trait CommandRunner: Send + Sync {
    /// Run `cmdline` in a subshell and return its captured stdout.
    ///
    /// # Errors
    /// Returns [`Error::SpawnFailed`] when the subshell cannot be launched.
    fn run(&self, cmdline: &str) -> Result<String, Error>;
}

/// The default `CommandRunner`, spawning `sh -c <cmdline>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellCommandRunner;

impl CommandRunner for ShellCommandRunner {
    fn run(&self, cmdline: &str) -> Result<String, Error> {
        trace!("Running command: {cmdline}");

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmdline)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::SpawnFailed(cmdline.to_string(), e))?;

        Ok(str::from_utf8(&output.stdout)
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let runner = ShellCommandRunner;
        let output = runner.run("echo hello").expect("command runs");
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn ignores_nonzero_exit() {
        let runner = ShellCommandRunner;
        let output = runner.run("echo partial; exit 1").expect("command runs");
        assert_eq!(output.trim(), "partial");
    }

    #[test]
    fn spawn_failure() {
        let runner = ShellCommandRunner;
        // An empty command line is valid for sh -c (does nothing), so use a
        // binary name guaranteed not to exist on the search path instead.
        let output = runner
            .run("definitely-not-a-real-command-xyz")
            .expect("sh itself launches fine");
        assert!(output.is_empty());
    }
}
