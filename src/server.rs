//! Service startup, HTTP surface and logging setup.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use taskmind_commands::{CapabilityDescriptor, CommandRegistry};
use taskmind_config::Config;
use taskmind_daemon::{ServiceController, shutdown_signal};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing: stderr always, plus daily-rotated files under `log_dir`.
pub(crate) fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("taskmind")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Shared state behind the HTTP handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub commands: Arc<CommandRegistry>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/capabilities", get(capabilities))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": state.commands.len(),
    }))
}

async fn capabilities(State(state): State<AppState>) -> Json<Vec<CapabilityDescriptor>> {
    Json(state.commands.descriptors())
}

/// Run the service in the foreground until SIGTERM or SIGINT.
pub(crate) async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = AppState {
        commands: Arc::new(CommandRegistry::standard(&config.commands)),
    };
    let app = router(state);
    let controller = ServiceController::new(config.server);

    info!(addr = %controller.addr(), "Starting service");
    controller
        .start(|listener| async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        })
        .await?;
    Ok(())
}
