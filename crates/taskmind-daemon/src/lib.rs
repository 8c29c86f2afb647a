//! # Task-Mind Daemon
//!
//! Liveness handshake for the background service.
//!
//! - PID file management (prevents duplicate instances, cleans stale files)
//! - Bounded startup: the listener is bound within the startup window or the
//!   start fails with a distinguishable error
//! - Idempotent stop via SIGTERM
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taskmind_daemon::ServiceController;
//!
//! let controller = ServiceController::new(config.server.clone());
//! controller
//!     .start(|listener| async move { axum::serve(listener, router).await })
//!     .await?;
//! ```

pub mod controller;
pub mod error;
pub mod pid;
pub mod signal;

pub use controller::{ServiceController, ServiceStatus, StopOutcome};
pub use error::DaemonError;
pub use pid::PidFile;
pub use signal::{send_terminate, shutdown_signal};
