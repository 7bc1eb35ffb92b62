// Filesystem-mediated rendezvous: waits for a worker to announce its URL.

use log::trace;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use crate::Error;

/// Blocks until `path` exists, checking every `poll_interval`.
///
/// This is a blocking call: run it on a blocking thread (e.g. via
/// `tokio::task::spawn_blocking`) rather than an async executor thread.
pub fn wait_for_file(path: &Path, poll_interval: Duration) {
    while !path.exists() {
        trace!("Waiting for '{}'.", path.display());
        std::thread::sleep(poll_interval);
    }
}

/// Opens `path` and reads its first line, trimming the trailing newline.
///
/// # Errors
/// Returns [`Error::FileRead`] if the file cannot be opened.
pub fn read_single_line(path: &Path) -> Result<String, Error> {
    let file = std::fs::File::open(path).map_err(|e| Error::FileRead(path.to_path_buf(), e))?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| Error::FileRead(path.to_path_buf(), e))?;

    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Builds the rendezvous file name a worker writes its URL into.
pub fn url_file_name(job_id: &str) -> String {
    format!("url-{job_id}.txt")
}

/// Removes stale rendezvous files matching `url-*.txt` left over from a
/// prior, uncleanly terminated gateway run.
///
/// # Errors
/// Returns [`Error::DirectoryRead`] if `dir` cannot be listed.
pub fn purge_stale_files(dir: &Path) -> Result<(), Error> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir).map_err(|e| Error::DirectoryRead(dir.to_path_buf(), e))? {
        let entry = entry.map_err(|e| Error::DirectoryRead(dir.to_path_buf(), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if name.starts_with("url-") && name.ends_with(".txt") {
            trace!("Purging stale rendezvous file '{name}'.");
            let _ = std::fs::remove_file(entry.path());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn reads_first_line_only() {
        let temp = TempDir::new().unwrap();
        let file = temp.child("url.txt");
        file.write_str("http://127.0.0.1:9999\nsecond line\n").unwrap();

        let line = read_single_line(file.path()).expect("file readable");
        assert_eq!(line, "http://127.0.0.1:9999");
    }

    #[test]
    fn wait_for_file_blocks_until_created() {
        let temp = TempDir::new().unwrap();
        let path = temp.child("url-42.txt");
        let wait_path = path.path().to_path_buf();

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            wait_for_file(&wait_path, Duration::from_millis(10));
            tx.send(()).unwrap();
        });

        thread::sleep(Duration::from_millis(30));
        path.write_str("http://worker").unwrap();

        rx.recv_timeout(Duration::from_secs(2))
            .expect("wait_for_file returns once the file appears");
        handle.join().unwrap();
    }

    #[test]
    fn purge_removes_only_url_files() {
        let temp = TempDir::new().unwrap();
        temp.child("url-1.txt").write_str("x").unwrap();
        temp.child("keep.txt").write_str("x").unwrap();

        purge_stale_files(temp.path()).expect("purge succeeds");

        temp.child("url-1.txt").assert(predicates::path::missing());
        temp.child("keep.txt").assert(predicates::path::exists());
    }
}
