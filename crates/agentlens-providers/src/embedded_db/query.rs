use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::warn;

use crate::{Error, Result};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_OUTPUT_BYTES: usize = 50 * 1024 * 1024;

/// A database file this crate is allowed to query out-of-process.
///
/// Deliberately not an open connection: every query is a fresh `sqlite3
/// -readonly` subprocess, so a corrupt or concurrently-written database can
/// never wedge the caller's process.
#[derive(Debug, Clone)]
pub struct DbHandle {
    path: PathBuf,
}

impl DbHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run `sql` against `db` via `sqlite3 -readonly -json`, bounded by
/// [`QUERY_TIMEOUT`] and [`MAX_OUTPUT_BYTES`]. Timeout or a non-zero exit
/// yields `Ok(vec![])` rather than an error: a slow or locked database should
/// degrade to "no new rows this poll", not take the watcher down.
pub fn run_readonly_query(db: &DbHandle, sql: &str) -> Result<Vec<Value>> {
    let mut child = Command::new("sqlite3")
        .arg("-readonly")
        .arg("-json")
        .arg(&db.path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(Error::Io)?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(sql.as_bytes());
    }

    let deadline = Instant::now() + QUERY_TIMEOUT;
    loop {
        match child.try_wait().map_err(Error::Io)? {
            Some(_status) => break,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                warn!(db = %db.path.display(), "sqlite3 query timed out");
                return Ok(Vec::new());
            }
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }

    let status = child.wait().map_err(Error::Io)?;
    let mut stdout = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.take(MAX_OUTPUT_BYTES as u64).read_to_end(&mut stdout);
    }

    if !status.success() {
        let mut stderr = String::new();
        if let Some(mut err) = child.stderr.take() {
            let _ = err.read_to_string(&mut stderr);
        }
        warn!(db = %db.path.display(), stderr = %stderr.trim(), "sqlite3 query exited non-zero");
        return Ok(Vec::new());
    }

    if stdout.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&stdout).map_err(Error::Json)
}
