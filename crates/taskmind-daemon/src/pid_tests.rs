use super::*;
use tempfile::TempDir;

/// Far above any kernel pid_max.
const DEAD_PID: u32 = 999_999_999;

fn temp_pid_file() -> (TempDir, PidFile) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run").join("server.pid");
    (dir, PidFile::new(path))
}

#[test]
fn test_missing_file_reads_none() {
    let (_dir, pid) = temp_pid_file();
    assert!(!pid.exists());
    assert!(pid.read_pid().unwrap().is_none());
    assert!(pid.live_pid().unwrap().is_none());
}

#[test]
fn test_write_and_read_pid() {
    let (_dir, pid) = temp_pid_file();
    pid.write_pid(12345).unwrap();

    assert!(pid.exists());
    assert_eq!(pid.read_pid().unwrap(), Some(12345));
}

#[test]
fn test_remove_is_idempotent() {
    let (_dir, pid) = temp_pid_file();
    pid.write_pid(12345).unwrap();
    pid.remove().unwrap();
    assert!(!pid.exists());
    assert!(pid.remove().is_ok());
}

#[test]
fn test_invalid_contents() {
    let (_dir, pid) = temp_pid_file();
    pid.write_pid(1).unwrap();
    std::fs::write(pid.path(), "not-a-pid").unwrap();

    assert!(matches!(pid.read_pid(), Err(DaemonError::PidFile { .. })));
    // live_pid treats garbage as stale.
    assert!(pid.live_pid().unwrap().is_none());
    assert!(!pid.exists());
}

#[cfg(unix)]
#[test]
fn test_live_pid_for_current_process() {
    let (_dir, pid) = temp_pid_file();
    pid.write_current().unwrap();
    assert_eq!(pid.live_pid().unwrap(), Some(std::process::id()));
    assert!(pid.exists());
}

#[cfg(unix)]
#[test]
fn test_stale_file_is_removed() {
    let (_dir, pid) = temp_pid_file();
    pid.write_pid(DEAD_PID).unwrap();

    assert!(pid.live_pid().unwrap().is_none());
    assert!(!pid.exists());
}

#[cfg(unix)]
#[test]
fn test_process_running() {
    assert!(is_process_running(std::process::id()));
    assert!(!is_process_running(DEAD_PID));
    assert!(!is_process_running(0));
}
