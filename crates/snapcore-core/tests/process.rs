//! Integration tests for forking dump children and polling them
//!
//! These tests fork the test binary for real. The children crash with
//! `SIGSEGV`, so depending on the host's `core_pattern` a core of the test
//! binary may be written (or piped to a crash collector). The tests only rely
//! on process state, never on a core file appearing.

#![cfg(unix)]

use std::thread;
use std::time::{Duration, Instant};

use snapcore_core::api;
use snapcore_core::error::CoreError;
use snapcore_core::monitor::{fork_core, poll_child};
use snapcore_core::session::{wait_for_exit, SessionConfig};
use snapcore_core::types::{ChildHandle, ChildStatus, DumpRequest, ExitInfo};
use tempfile::TempDir;

const WAIT_LIMIT: Duration = Duration::from_secs(120);

/// Short directory under /tmp (must fit the 31-byte directory buffer)
///
/// Removed on drop together with any core written into it.
fn dump_dir() -> TempDir
{
    tempfile::Builder::new().prefix("sc").tempdir_in("/tmp").unwrap()
}

fn wait_until_completed(child: ChildHandle) -> ExitInfo
{
    let started = Instant::now();
    loop {
        match poll_child(child).unwrap() {
            ChildStatus::Completed(info) => return info,
            ChildStatus::Pending => {
                assert!(started.elapsed() < WAIT_LIMIT, "child {child} never exited");
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

fn assert_crashed(info: &ExitInfo)
{
    assert!(info.killed_by_signal(), "child exited normally: {info:?}");
    let signal = info.signal.unwrap();
    assert!(signal == libc::SIGSEGV || signal == libc::SIGABRT, "unexpected signal {signal}");
    assert_eq!(info.code, None);
}

#[test]
fn test_child_completes_exactly_once()
{
    let dir = dump_dir();
    let request = DumpRequest::new(dir.path()).unwrap();

    let child = fork_core(&request).unwrap();
    assert!(child.pid() > 0);
    assert_ne!(child.pid(), std::process::id());

    let info = wait_until_completed(child);
    assert_crashed(&info);

    // Reaped by the poll above
    assert!(matches!(poll_child(child), Err(CoreError::ChildNotFound(_))));
}

#[test]
fn test_boundary_round_trip()
{
    let dir = dump_dir();
    let outcome = api::fork_core(dir.path().to_str()).unwrap();
    assert!(outcome.child_pid > 0);

    let started = Instant::now();
    while !api::check_child(i64::from(outcome.child_pid)).unwrap() {
        assert!(started.elapsed() < WAIT_LIMIT);
        thread::sleep(Duration::from_millis(10));
    }

    match api::check_child(i64::from(outcome.child_pid)) {
        Err(CoreError::ChildNotFound(pid)) => assert_eq!(pid, i64::from(outcome.child_pid)),
        other => panic!("expected ChildNotFound, got {other:?}"),
    }
}

#[test]
fn test_check_child_on_foreign_pid()
{
    // Our own pid is never our child
    let own = i64::from(std::process::id());
    assert!(matches!(api::check_child(own), Err(CoreError::ChildNotFound(_))));
}

#[test]
fn test_long_directory_is_rejected_before_fork()
{
    let long = format!("/tmp/{}", "x".repeat(40));
    assert!(matches!(api::fork_core(Some(long.as_str())), Err(CoreError::PathTooLong { .. })));
}

#[test]
fn test_concurrent_dumps_resolve_independently()
{
    let first_dir = dump_dir();
    let second_dir = dump_dir();

    let first = fork_core(&DumpRequest::new(first_dir.path()).unwrap()).unwrap();
    let second = fork_core(&DumpRequest::new(second_dir.path()).unwrap()).unwrap();
    assert_ne!(first, second);

    // Wait on the second one first
    assert_crashed(&wait_until_completed(second));
    assert_crashed(&wait_until_completed(first));

    assert!(matches!(poll_child(first), Err(CoreError::ChildNotFound(_))));
    assert!(matches!(poll_child(second), Err(CoreError::ChildNotFound(_))));
}

#[tokio::test]
async fn test_wait_for_exit_on_dump_child()
{
    let dir = dump_dir();
    let child = fork_core(&DumpRequest::new(dir.path()).unwrap()).unwrap();

    let config = SessionConfig::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_timeout(Some(WAIT_LIMIT));
    let info = wait_for_exit(child, &config).await.unwrap();
    assert_crashed(&info);
}

#[tokio::test]
async fn test_wait_for_exit_times_out_on_running_child()
{
    let pid = unsafe { libc::fork() };
    assert!(pid >= 0);
    if pid == 0 {
        // Child: stay alive until killed
        unsafe {
            libc::pause();
            libc::_exit(0);
        }
    }
    let child = ChildHandle(pid.unsigned_abs());

    let config = SessionConfig::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_timeout(Some(Duration::from_millis(50)));
    match wait_for_exit(child, &config).await {
        Err(CoreError::WaitTimedOut { pid, waited }) => {
            assert_eq!(pid, child.pid());
            assert!(waited >= Duration::from_millis(50));
        }
        other => panic!("expected WaitTimedOut, got {other:?}"),
    }

    // The handle is still good after a timeout
    assert_eq!(poll_child(child).unwrap(), ChildStatus::Pending);

    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
    let info = wait_until_completed(child);
    assert_eq!(info.signal, Some(libc::SIGKILL));
}
