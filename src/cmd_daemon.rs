//! Stop and status subcommand handlers.

use std::process::ExitCode;

use taskmind_config::ServerConfig;
use taskmind_daemon::{ServiceController, ServiceStatus, StopOutcome};

pub(crate) async fn stop(config: ServerConfig) -> anyhow::Result<ExitCode> {
    let controller = ServiceController::new(config);
    match controller.stop().await? {
        StopOutcome::Stopped { pid } => println!("Service stopped (PID {})", pid),
        StopOutcome::NotRunning => println!("Service is not running"),
    }
    Ok(ExitCode::SUCCESS)
}

/// Exit code 0 when running, 1 otherwise.
pub(crate) fn status(config: ServerConfig) -> anyhow::Result<ExitCode> {
    let controller = ServiceController::new(config);
    let status = controller.status()?;
    println!("Service is {} ({})", status, controller.addr());
    Ok(match status {
        ServiceStatus::Running { .. } => ExitCode::SUCCESS,
        ServiceStatus::NotRunning => ExitCode::FAILURE,
    })
}
