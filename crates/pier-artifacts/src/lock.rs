//! Advisory file locks
//!
//! Uses `fs2` (flock on Unix). The lock is tied to the open handle and is
//! released on drop, including when the holder crashes.

use crate::error::{ArtifactError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const MAX_BACKOFF: Duration = Duration::from_millis(500);

/// Exclusive advisory lock held for the lifetime of the value
#[derive(Debug)]
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    /// Take the lock at `path`, retrying with backoff until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// `ArtifactError::Busy` when another process still holds the lock at the
    /// deadline.
    pub async fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(path)
                .map_err(|e| ArtifactError::io(path, e))?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let mut file = file;
                    // Holder pid is informational only
                    let _ = file.set_len(0);
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(lock = %path.display(), "Lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(_) if Instant::now() < deadline => {
                    debug!(lock = %path.display(), ?backoff, "Lock held elsewhere, waiting");
                    drop(file);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(_) => {
                    warn!(lock = %path.display(), "Gave up waiting for lock");
                    return Err(ArtifactError::Busy {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        // The file stays on disk; unlinking it would race with waiters.
        let _ = self.file.unlock();
        debug!(path = %self.path.display(), "Lock released");
    }
}
