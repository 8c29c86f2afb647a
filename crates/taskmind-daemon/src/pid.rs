//! PID file management for the background service.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::DaemonError;

/// PID file recording which process owns the service.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the recorded PID. A missing file is `None`.
    pub fn read_pid(&self) -> Result<Option<u32>, DaemonError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e.to_string())),
        };

        let pid = contents
            .trim()
            .parse::<u32>()
            .map_err(|e| self.error(format!("Invalid PID format: {}", e)))?;
        Ok(Some(pid))
    }

    /// Recorded PID, if the process behind it is still alive.
    ///
    /// Unreadable or stale files are removed.
    pub fn live_pid(&self) -> Result<Option<u32>, DaemonError> {
        let pid = match self.read_pid() {
            Ok(Some(pid)) => pid,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Removing unreadable PID file: {}", e);
                self.remove()?;
                return Ok(None);
            }
        };

        if is_process_running(pid) {
            return Ok(Some(pid));
        }
        warn!(
            "Removing stale PID file (PID {} not running): {}",
            pid,
            self.path.display()
        );
        self.remove()?;
        Ok(None)
    }

    /// Record the current process.
    pub fn write_current(&self) -> Result<(), DaemonError> {
        self.write_pid(std::process::id())
    }

    pub fn write_pid(&self, pid: u32) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| self.error(format!("Failed to create parent directory: {}", e)))?;
        }
        fs::write(&self.path, pid.to_string()).map_err(|e| self.error(e.to_string()))?;
        info!("PID file created: {} (PID: {})", self.path.display(), pid);
        Ok(())
    }

    /// Remove the file. Removing a missing file is not an error.
    pub fn remove(&self) -> Result<(), DaemonError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("PID file removed: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e.to_string())),
        }
    }

    fn error(&self, reason: String) -> DaemonError {
        DaemonError::PidFile {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // 0 would address our own process group.
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists but belongs to another user.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_process_running(_pid: u32) -> bool {
    // No cheap liveness probe; trust the file.
    true
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
