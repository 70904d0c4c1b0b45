//! Agent debug-log tails.
//!
//! The agent writes a debug log per session to `<dir>/<session id>.txt`.
//! While it is being written to, its tail is better evidence than the
//! screen; once it goes quiet the poller falls back to screen capture.
//!
//! All functions here do blocking file I/O. Call them via `spawn_blocking`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::trace;

use hud_core::ExternalId;

/// Lines of tail handed to the classifier.
pub const TAIL_LINES: usize = 100;

/// A log modified longer ago than this is considered stale.
pub const FRESHNESS: Duration = Duration::from_secs(30);

/// Upper bound on bytes read from the end of the file.
const TAIL_BYTES: u64 = 64 * 1024;

/// Reads recent debug-log lines for known agent sessions.
#[derive(Debug, Clone)]
pub struct DebugLogReader {
    dir: PathBuf,
    freshness: Duration,
}

impl DebugLogReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            freshness: FRESHNESS,
        }
    }

    #[must_use]
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Path of the log for `external_id`, if the id is a plain file name.
    pub fn log_path(&self, external_id: &ExternalId) -> Option<PathBuf> {
        let id = external_id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return None;
        }
        Some(self.dir.join(format!("{id}.txt")))
    }

    /// Tail of the session's log if it was written to recently.
    pub fn read_fresh(&self, external_id: &ExternalId) -> Option<Vec<String>> {
        self.read_fresh_at(external_id, SystemTime::now())
    }

    pub fn read_fresh_at(&self, external_id: &ExternalId, now: SystemTime) -> Option<Vec<String>> {
        let path = self.log_path(external_id)?;
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;

        // A clock running backwards counts as fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age > self.freshness {
            trace!(path = %path.display(), age_secs = age.as_secs(), "Debug log stale");
            return None;
        }

        read_tail(&path, TAIL_LINES).ok()
    }
}

/// Last `count` lines of a file, reading at most [`TAIL_BYTES`].
fn read_tail(path: &Path, count: usize) -> std::io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(TAIL_BYTES);
    file.seek(SeekFrom::Start(start))?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut lines: Vec<&str> = text.lines().collect();
    if start > 0 && !lines.is_empty() {
        // First line was cut by the seek.
        lines.remove(0);
    }

    let skip = lines.len().saturating_sub(count);
    Ok(lines.into_iter().skip(skip).map(String::from).collect())
}
