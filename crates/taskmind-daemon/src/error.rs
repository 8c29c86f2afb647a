//! Daemon-related errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while starting or stopping the service.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A live process already owns the PID file.
    #[error("Service already running (PID: {pid})")]
    AlreadyRunning { pid: u32 },

    /// The listening address is taken by another process.
    #[error("Port unavailable: {addr} is already in use")]
    PortUnavailable { addr: String },

    /// Any other failure before the service was listening.
    #[error("Startup failed: {0}")]
    Startup(String),

    /// Failed to read or write the PID file.
    #[error("PID file error at {path}: {reason}")]
    PidFile { path: PathBuf, reason: String },

    /// Failed to deliver a signal.
    #[error("Failed to signal PID {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    /// The process ignored SIGTERM for the whole stop window.
    #[error("PID {pid} did not exit within {waited_ms}ms")]
    StopTimeout { pid: u32, waited_ms: u64 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
