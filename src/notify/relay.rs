//! File-backed notification queue
//!
//! Pending notifications live in one line-oriented text file, one JSON
//! record per line, no header or index. Each record carries a `userID`
//! field used for routing. A poll reads the whole file, delivers the
//! lines matching the polling user, and rewrites the file with only
//! the rest, so a delivered record is consumed exactly once per pass
//! and records for users with no connected reader wait for a later
//! poll.
//!
//! One mutex serializes every read-modify-write cycle across all
//! concurrent pollers. This bounds relay throughput, which is
//! acceptable at 1-second poll granularity.
//!
//! Lines that fail to parse are rewritten back verbatim, so a
//! transient producer bug does not lose data permanently.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from relay file operations
///
/// All of these are recoverable from the caller's perspective: the
/// poll loop logs and retries on its next tick.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to read notification file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to rewrite notification file {path:?}: {source}")]
    Rewrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Shared queue of pending notification records
pub struct NotificationRelay {
    path: PathBuf,
    /// Serializes the full read-partition-rewrite cycle.
    lock: Mutex<()>,
}

impl NotificationRelay {
    /// Create a relay over the given backing file
    ///
    /// The file does not need to exist yet; a missing file reads as an
    /// empty queue.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain the records pending for `user_id`
    ///
    /// Returns the matching record lines in insertion order and
    /// rewrites the backing file with everything else. The returned
    /// records are consumed regardless of whether the caller manages
    /// to deliver them (at-most-once per record per pass).
    pub async fn poll(&self, user_id: &str) -> RelayResult<Vec<String>> {
        let _guard = self.lock.lock().await;

        let lines = self.read_lines().await?;
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut matched = Vec::new();
        let mut remaining = Vec::new();

        for line in lines {
            match record_user_id(&line) {
                Some(owner) if owner == user_id => matched.push(line),
                // Not ours, or unparseable: keep it in the file.
                _ => remaining.push(line),
            }
        }

        if !matched.is_empty() {
            self.write_lines(&remaining).await?;
        }

        Ok(matched)
    }

    async fn read_lines(&self) -> RelayResult<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()),
            // Missing file means no pending notifications, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RelayError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    async fn write_lines(&self, lines: &[String]) -> RelayResult<()> {
        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| RelayError::Rewrite {
                path: self.path.clone(),
                source: e,
            })
    }
}

/// Extract the routing `userID` from one record line, if it parses
fn record_user_id(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value
        .get("userID")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
