use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

fn controller(dir: &TempDir, port: u16) -> ServiceController {
    ServiceController::new(ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        pid_file: dir.path().join("server.pid"),
        startup_timeout_ms: 2_000,
    })
}

#[tokio::test]
async fn test_start_writes_pid_then_cleans_up() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);
    let pid_path = controller.pid_file().path().to_path_buf();

    controller
        .start(|listener| async move {
            assert!(listener.local_addr()?.port() > 0);
            let recorded = std::fs::read_to_string(&pid_path)?;
            assert_eq!(recorded, std::process::id().to_string());
            Ok(())
        })
        .await
        .unwrap();

    assert!(!controller.pid_file().exists());
}

#[tokio::test]
async fn test_start_refuses_when_already_running() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);
    controller.pid_file().write_current().unwrap();

    let served = Arc::new(AtomicBool::new(false));
    let flag = served.clone();
    let err = controller
        .start(|_| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DaemonError::AlreadyRunning { pid } if pid == std::process::id()));
    assert!(!served.load(Ordering::SeqCst));
    // The running instance keeps its file.
    assert!(controller.pid_file().exists());
}

#[tokio::test]
async fn test_start_replaces_stale_pid_file() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);
    controller.pid_file().write_pid(999_999_999).unwrap();

    controller.start(|_| async { Ok(()) }).await.unwrap();
    assert!(!controller.pid_file().exists());
}

#[tokio::test]
async fn test_start_reports_port_in_use() {
    let dir = TempDir::new().unwrap();
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();
    let controller = controller(&dir, port);

    let err = controller.start(|_| async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, DaemonError::PortUnavailable { ref addr } if addr.ends_with(&port.to_string())));
    assert!(!controller.pid_file().exists());
}

#[tokio::test]
async fn test_start_reports_other_bind_failures() {
    let dir = TempDir::new().unwrap();
    let controller = ServiceController::new(ServerConfig {
        // TEST-NET-1, never assigned to a local interface.
        host: "192.0.2.1".to_string(),
        port: 0,
        pid_file: dir.path().join("server.pid"),
        startup_timeout_ms: 2_000,
    });

    let err = controller.start(|_| async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, DaemonError::Startup(_)));
}

#[tokio::test]
async fn test_serve_error_still_removes_pid_file() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);

    let err = controller
        .start(|_| async { Err(io::Error::other("accept loop failed")) })
        .await
        .unwrap_err();

    assert!(matches!(err, DaemonError::Io(_)));
    assert!(!controller.pid_file().exists());
}

#[tokio::test]
async fn test_stop_when_not_running() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);

    assert_eq!(controller.stop().await.unwrap(), StopOutcome::NotRunning);
    // Still idempotent.
    assert_eq!(controller.stop().await.unwrap(), StopOutcome::NotRunning);
}

#[tokio::test]
async fn test_stop_cleans_stale_file() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);
    controller.pid_file().write_pid(999_999_999).unwrap();

    assert_eq!(controller.stop().await.unwrap(), StopOutcome::NotRunning);
    assert!(!controller.pid_file().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_stop_terminates_recorded_process() {
    let dir = TempDir::new().unwrap();
    let controller = controller(&dir, 0);

    let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let pid = child.id();
    // Reap the child so it does not linger as a zombie after SIGTERM.
    let reaper = std::thread::spawn(move || child.wait());
    controller.pid_file().write_pid(pid).unwrap();

    assert_eq!(controller.status().unwrap(), ServiceStatus::Running { pid });
    assert_eq!(controller.stop().await.unwrap(), StopOutcome::Stopped { pid });
    assert!(!controller.pid_file().exists());
    assert_eq!(controller.status().unwrap(), ServiceStatus::NotRunning);

    let status = reaper.join().unwrap().unwrap();
    assert!(!status.success());
}

#[test]
fn test_status_display() {
    assert_eq!(ServiceStatus::Running { pid: 42 }.to_string(), "running (PID 42)");
    assert_eq!(ServiceStatus::NotRunning.to_string(), "not running");
}
