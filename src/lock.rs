//! Single-instance lock
//!
//! The PID file doubles as an advisory lock: the first instance holds
//! `flock(LOCK_EX | LOCK_NB)` on it for its whole lifetime and a second
//! launch fails immediately. The kernel drops the lock when the process dies,
//! so a stale PID file never blocks a restart.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Held lock; released when dropped
#[derive(Debug)]
pub struct PidLock {
    file: File,
    path: PathBuf,
}

impl PidLock {
    /// Take the lock and record our PID in the file
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(LockError::Io)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(LockError::Io)?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            return Err(if err.kind() == std::io::ErrorKind::WouldBlock {
                LockError::AlreadyRunning(path)
            } else {
                LockError::Io(err)
            });
        }

        file.set_len(0).map_err(LockError::Io)?;
        file.seek(SeekFrom::Start(0)).map_err(LockError::Io)?;
        writeln!(file, "{}", std::process::id()).map_err(LockError::Io)?;

        tracing::debug!(path = %path.display(), "PID lock acquired");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        // SAFETY: the descriptor is still owned by `self.file`
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

/// Lock error type
#[derive(Debug)]
pub enum LockError {
    /// Another instance holds the lock
    AlreadyRunning(PathBuf),
    Io(std::io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::AlreadyRunning(path) => {
                write!(f, "Another front-paneld instance is running (lock {})", path.display())
            }
            LockError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::Io(e) => Some(e),
            LockError::AlreadyRunning(_) => None,
        }
    }
}
