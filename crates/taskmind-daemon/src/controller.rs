//! Start/stop/status handshake for the background service.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use taskmind_config::ServerConfig;

use crate::error::DaemonError;
use crate::pid::{PidFile, is_process_running};
use crate::signal::send_terminate;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running; any stale PID file has been cleaned up.
    NotRunning,
    Stopped { pid: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running { pid: u32 },
    NotRunning,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Running { pid } => write!(f, "running (PID {})", pid),
            ServiceStatus::NotRunning => write!(f, "not running"),
        }
    }
}

/// Owns the PID file and the listening address of one service.
#[derive(Debug, Clone)]
pub struct ServiceController {
    config: ServerConfig,
    pid_file: PidFile,
    stop_timeout: Duration,
}

impl ServiceController {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            pid_file: PidFile::new(&config.pid_file),
            config,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// How long `stop` waits for the process to exit after SIGTERM.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.config.startup_timeout_ms)
    }

    /// Claim the PID file, bind the listener and run `serve` until it returns.
    ///
    /// The PID file is removed when `serve` finishes, whatever its outcome.
    pub async fn start<F, Fut>(&self, serve: F) -> Result<(), DaemonError>
    where
        F: FnOnce(TcpListener) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        if let Some(pid) = self.pid_file.live_pid()? {
            return Err(DaemonError::AlreadyRunning { pid });
        }

        let listener = self.bind().await?;
        self.pid_file.write_current()?;
        info!(addr = %self.addr(), pid = std::process::id(), "Service listening");

        let served = serve(listener).await;
        self.pid_file.remove()?;

        match served {
            Ok(()) => {
                info!("Service stopped");
                Ok(())
            }
            Err(e) => {
                error!("Service exited with error: {}", e);
                Err(DaemonError::Io(e))
            }
        }
    }

    async fn bind(&self) -> Result<TcpListener, DaemonError> {
        let addr = self.addr();
        let window = self.startup_timeout();

        match tokio::time::timeout(window, TcpListener::bind(addr.as_str())).await {
            Ok(Ok(listener)) => Ok(listener),
            Ok(Err(e)) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(DaemonError::PortUnavailable { addr })
            }
            Ok(Err(e)) => Err(DaemonError::Startup(format!("failed to bind {}: {}", addr, e))),
            Err(_) => Err(DaemonError::Startup(format!(
                "could not bind {} within {}ms",
                addr,
                window.as_millis()
            ))),
        }
    }

    /// Terminate the recorded process. Stopping a stopped service is not an error.
    pub async fn stop(&self) -> Result<StopOutcome, DaemonError> {
        let Some(pid) = self.pid_file.live_pid()? else {
            debug!("Stop requested but service is not running");
            return Ok(StopOutcome::NotRunning);
        };

        send_terminate(pid)?;

        let deadline = tokio::time::Instant::now() + self.stop_timeout;
        while is_process_running(pid) {
            if tokio::time::Instant::now() >= deadline {
                return Err(DaemonError::StopTimeout {
                    pid,
                    waited_ms: self.stop_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }

        // The service removes its own file on clean exit; this covers a crash.
        self.pid_file.remove()?;
        info!("Service stopped (PID {})", pid);
        Ok(StopOutcome::Stopped { pid })
    }

    pub fn status(&self) -> Result<ServiceStatus, DaemonError> {
        Ok(match self.pid_file.live_pid()? {
            Some(pid) => ServiceStatus::Running { pid },
            None => ServiceStatus::NotRunning,
        })
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
