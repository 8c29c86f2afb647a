//! Signal delivery and shutdown notification.

use tracing::info;

use crate::error::DaemonError;

/// Resolve when the process is asked to shut down (SIGTERM or SIGINT).
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        _ => {
            // Fall back to Ctrl+C only.
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C");
}

/// Ask the process behind `pid` to terminate.
#[cfg(unix)]
pub fn send_terminate(pid: u32) -> Result<(), DaemonError> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .ok_or_else(|| DaemonError::Signal {
            pid,
            reason: "invalid PID".to_string(),
        })?;

    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|e| DaemonError::Signal {
        pid,
        reason: e.to_string(),
    })?;

    info!("Sent SIGTERM to PID {}", pid);
    Ok(())
}

#[cfg(not(unix))]
pub fn send_terminate(pid: u32) -> Result<(), DaemonError> {
    Err(DaemonError::Signal {
        pid,
        reason: "signal delivery not supported on this platform".to_string(),
    })
}
