//! # Dump Sessions
//!
//! End-to-end helpers built on the fork/poll primitives for async callers:
//!
//! - [`create_core`]: dump this process into a fresh, timestamped work
//!   directory and return where the core landed
//! - [`collect_core`]: same, plus copy every loaded library next to the core
//!   and package the lot as `<work dir>.tar.gz` for analysis elsewhere
//!
//! Everything up to `fork()` runs synchronously so the process changes as
//! little as possible between the request and the snapshot. Waiting happens
//! on the `tokio` timer, one non-blocking poll per tick.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::libraries::find_libraries;
use crate::monitor::{fork_core, poll_child};
use crate::types::{ChildHandle, ChildStatus, DumpRequest, ExitInfo};

/// Per-process sequence number that keeps work directory names unique
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Default delay between two polls of a dumping child
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Session settings
///
/// Work directories are always created in the current working directory.
/// Their names alone take up most of the child's directory buffer, so a
/// base directory prefix would not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig
{
    /// Delay between polls
    pub poll_interval: Duration,
    /// Give up waiting after this long (`None`: wait forever)
    pub timeout: Option<Duration>,
}

impl Default for SessionConfig
{
    fn default() -> Self
    {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl SessionConfig
{
    /// Set the poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self
    {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the wait deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self
    {
        self.timeout = timeout;
        self
    }
}

fn next_work_dir() -> PathBuf
{
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
    PathBuf::from(work_dir_name(&Local::now(), std::process::id(), seq))
}

/// Name of a work directory: `core_YYYYMMDD.HHMMSS.<pid>.<seq>`
///
/// The sequence number is zero padded to three digits.
pub fn work_dir_name<Tz>(now: &DateTime<Tz>, pid: u32, seq: u32) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("core_{}.{pid}.{seq:03}", now.format("%Y%m%d.%H%M%S"))
}

/// Places the kernel is likely to have put the core of `pid`
pub fn core_candidates(work_dir: &Path, pid: u32) -> Vec<PathBuf>
{
    let mut candidates = vec![work_dir.join(format!("core.{pid}"))];
    if cfg!(any(target_os = "macos", target_os = "ios")) {
        // Default kern.corefile is /cores/core.%P
        candidates.push(PathBuf::from(format!("/cores/core.{pid}")));
    } else {
        candidates.push(work_dir.join("core"));
    }
    candidates
}

/// First existing core candidate for `pid`
pub fn find_core(work_dir: &Path, pid: u32) -> Option<PathBuf>
{
    core_candidates(work_dir, pid).into_iter().find(|path| path.exists())
}

/// Where a library is copied inside a collection
///
/// Absolute paths are re-rooted under `work_dir` so extracting the archive
/// can never overwrite system files. Names that are not paths (such as
/// `linux-vdso.so.1`, which has no backing file) yield `None`.
pub fn library_destination(work_dir: &Path, library: &str) -> Option<PathBuf>
{
    let relative = Path::new(library).strip_prefix("/").ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(work_dir.join(relative))
}

/// Poll `child` every `config.poll_interval` until it exits
///
/// ## Errors
///
/// - `WaitTimedOut`: `config.timeout` elapsed first (the child is left
///   running and unreaped; the handle stays valid)
/// - anything [`poll_child`] reports
pub async fn wait_for_exit(child: ChildHandle, config: &SessionConfig) -> CoreResult<ExitInfo>
{
    let started = Instant::now();
    loop {
        match poll_child(child)? {
            ChildStatus::Completed(exit) => return Ok(exit),
            ChildStatus::Pending => {
                if let Some(timeout) = config.timeout {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(CoreError::WaitTimedOut { pid: child.0, waited });
                    }
                }
                tokio::time::sleep(config.poll_interval).await;
            }
        }
    }
}

/// A finished dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreDump
{
    /// Work directory the child crashed in
    pub work_dir: PathBuf,
    /// Location of the core file
    pub core_path: PathBuf,
    /// The child that produced it
    pub child: ChildHandle,
    /// How the child ended
    pub exit: ExitInfo,
}

/// Work directory created and child forked, not yet waited on
struct PendingDump
{
    work_dir: PathBuf,
    child: ChildHandle,
}

fn ensure_supported() -> CoreResult<()>
{
    if cfg!(unix) {
        Ok(())
    } else {
        Err(CoreError::Unsupported("core sessions"))
    }
}

fn prepare_work_dir() -> CoreResult<(PathBuf, DumpRequest)>
{
    let work_dir = next_work_dir();
    // Validate before touching the filesystem
    let request = DumpRequest::new(&work_dir)?;
    fs::create_dir(&work_dir)?;
    Ok((work_dir, request))
}

fn start(work_dir: PathBuf, request: &DumpRequest) -> CoreResult<PendingDump>
{
    start_with(work_dir, request, fork_core)
}

fn start_with<F>(work_dir: PathBuf, request: &DumpRequest, fork: F) -> CoreResult<PendingDump>
where
    F: FnOnce(&DumpRequest) -> CoreResult<ChildHandle>,
{
    match fork(request) {
        Ok(child) => {
            info!(child_pid = child.0, work_dir = %work_dir.display(), "Dump started");
            Ok(PendingDump { work_dir, child })
        }
        Err(e) => {
            // Still empty: nothing ran in it
            if let Err(remove_error) = fs::remove_dir(&work_dir) {
                warn!(work_dir = %work_dir.display(), error = %remove_error, "Failed to remove work directory");
            }
            Err(e)
        }
    }
}

async fn finish(pending: PendingDump, config: &SessionConfig) -> CoreResult<CoreDump>
{
    let PendingDump { work_dir, child } = pending;
    let exit = wait_for_exit(child, config).await?;
    debug!(child_pid = child.0, ?exit, "Dump child finished");

    let core_path = find_core(&work_dir, child.0).ok_or_else(|| CoreError::CoreNotFound(work_dir.clone()))?;
    info!(core = %core_path.display(), "Core file created");

    Ok(CoreDump {
        work_dir,
        core_path,
        child,
        exit,
    })
}

/// Dump this process and return where the core was written
///
/// ## Errors
///
/// - any validation or fork error from the primitives
/// - `Io`: the work directory could not be created
/// - `WaitTimedOut`: the configured deadline passed
/// - `CoreNotFound`: the child exited but no core is where we looked
///   (core dumps disabled, `core_pattern` piping elsewhere, failed `chdir`)
pub async fn create_core(config: &SessionConfig) -> CoreResult<CoreDump>
{
    ensure_supported()?;
    let (work_dir, request) = prepare_work_dir()?;
    let pending = start(work_dir, &request)?;
    finish(pending, config).await
}

/// Dump this process, gather its libraries and package both
///
/// Returns the path of the `.tar.gz` archive. The work directory is removed
/// once the archive has been written.
///
/// ## Errors
///
/// Everything [`create_core`] reports, plus:
/// - `Io`: copying the core or a library failed (the last failure wins)
/// - `ArchiveFailed`: `tar` could not be run or exited non-zero
pub async fn collect_core(config: &SessionConfig) -> CoreResult<PathBuf>
{
    ensure_supported()?;
    let (work_dir, request) = prepare_work_dir()?;

    // Take the library list before anything async can load or unload one
    let libraries = find_libraries();
    let pending = start(work_dir, &request)?;
    let dump = finish(pending, config).await?;

    gather(&dump, &libraries).await?;
    archive(&dump.work_dir).await
}

/// Bring the core and every library into the work directory
///
/// Keeps going after a failed copy; the last failure is returned.
async fn gather(dump: &CoreDump, libraries: &[String]) -> CoreResult<()>
{
    let mut copy_error: Option<std::io::Error> = None;

    if dump.core_path.parent() != Some(dump.work_dir.as_path()) {
        let dest = dump.work_dir.join(format!("core.{}", dump.child.0));
        debug!(from = %dump.core_path.display(), to = %dest.display(), "Copying core into work directory");
        if let Err(e) = tokio::fs::copy(&dump.core_path, &dest).await {
            warn!(error = %e, "Failed to copy core file");
            copy_error = Some(e);
        }
    }

    for library in libraries {
        let Some(dest) = library_destination(&dump.work_dir, library) else {
            debug!(library = %library, "Skipping library without a backing file");
            continue;
        };
        if let Err(e) = copy_library(library, &dest).await {
            warn!(library = %library, error = %e, "Failed to copy library");
            copy_error = Some(e);
        }
    }

    match copy_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn copy_library(library: &str, dest: &Path) -> std::io::Result<()>
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // fs::copy follows symlinks, so the archive holds real files
    tokio::fs::copy(library, dest).await?;
    Ok(())
}

async fn archive(work_dir: &Path) -> CoreResult<PathBuf>
{
    let mut tar_name = OsString::from(work_dir.as_os_str());
    tar_name.push(".tar.gz");
    let tar_file = PathBuf::from(tar_name);

    let status = tokio::process::Command::new("tar")
        .arg("-czf")
        .arg(&tar_file)
        .arg(work_dir)
        .status()
        .await;

    if let Err(e) = tokio::fs::remove_dir_all(work_dir).await {
        warn!(work_dir = %work_dir.display(), error = %e, "Failed to remove work directory");
    }

    match status {
        Ok(status) if status.success() => {
            info!(archive = %tar_file.display(), "Core and libraries collected");
            Ok(tar_file)
        }
        Ok(status) => Err(CoreError::ArchiveFailed(format!("tar exited with {status}"))),
        Err(e) => Err(CoreError::ArchiveFailed(format!("could not run tar: {e}"))),
    }
}

#[cfg(test)]
mod tests
{
    use std::io;

    use chrono::Utc;

    use super::*;

    fn dump_in(work_dir: &Path, core_path: PathBuf) -> CoreDump
    {
        CoreDump {
            work_dir: work_dir.to_path_buf(),
            core_path,
            child: ChildHandle(99),
            exit: ExitInfo {
                code: None,
                signal: Some(libc::SIGSEGV),
                core_dumped: true,
            },
        }
    }

    #[test]
    fn test_work_dir_name_format()
    {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 5, 7).unwrap();
        assert_eq!(work_dir_name(&now, 4242, 1), "core_20261019.090507.4242.001");
        assert_eq!(work_dir_name(&now, 4242, 1234), "core_20261019.090507.4242.1234");
    }

    #[test]
    fn test_work_dir_name_fits_directory_buffer_for_six_digit_pids()
    {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 5, 7).unwrap();
        let name = work_dir_name(&now, 999_999, 999);
        assert!(DumpRequest::new(&name).is_ok());
    }

    #[test]
    fn test_next_work_dir_is_unique_and_relative()
    {
        let first = next_work_dir();
        let second = next_work_dir();
        assert_ne!(first, second);
        assert!(first.is_relative());
        assert!(first.to_string_lossy().starts_with("core_"));
        assert!(DumpRequest::new(&first).is_ok());
    }

    #[test]
    fn test_library_destination()
    {
        let work = Path::new("core_x");
        assert_eq!(
            library_destination(work, "/lib/x86_64-linux-gnu/libc.so.6"),
            Some(PathBuf::from("core_x/lib/x86_64-linux-gnu/libc.so.6"))
        );
        assert_eq!(library_destination(work, "linux-vdso.so.1"), None);
        assert_eq!(library_destination(work, "/"), None);
    }

    #[test]
    fn test_find_core_prefers_pid_suffixed_name()
    {
        let work_dir = tempfile::tempdir().unwrap();
        assert_eq!(find_core(work_dir.path(), 77), None);

        fs::write(work_dir.path().join("core.77"), b"core").unwrap();
        assert_eq!(find_core(work_dir.path(), 77), Some(work_dir.path().join("core.77")));
    }

    #[test]
    fn test_config_builders()
    {
        let config = SessionConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Some(Duration::from_secs(3)));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(SessionConfig::default().poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_failed_fork_removes_work_dir()
    {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work");
        fs::create_dir(&work_dir).unwrap();
        let request = DumpRequest::new("work").unwrap();

        let result = start_with(work_dir.clone(), &request, |_| {
            Err(CoreError::ForkFailed(io::Error::from(io::ErrorKind::WouldBlock)))
        });
        assert!(matches!(result, Err(CoreError::ForkFailed(_))));
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_successful_fork_keeps_work_dir()
    {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work");
        fs::create_dir(&work_dir).unwrap();
        let request = DumpRequest::new("work").unwrap();

        let pending = start_with(work_dir.clone(), &request, |_| Ok(ChildHandle(1234))).unwrap();
        assert_eq!(pending.child, ChildHandle(1234));
        assert_eq!(pending.work_dir, work_dir);
        assert!(work_dir.is_dir());
    }

    #[tokio::test]
    async fn test_gather_copies_stray_core_and_reroots_libraries()
    {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work");
        fs::create_dir(&work_dir).unwrap();

        let stray_core = tmp.path().join("elsewhere.core");
        fs::write(&stray_core, b"core bytes").unwrap();
        let lib_dir = tmp.path().join("lib");
        fs::create_dir(&lib_dir).unwrap();
        let library = lib_dir.join("libdemo.so.1");
        fs::write(&library, b"elf").unwrap();

        let libraries = vec![library.to_string_lossy().into_owned(), "linux-vdso.so.1".to_string()];
        gather(&dump_in(&work_dir, stray_core), &libraries).await.unwrap();

        assert_eq!(fs::read(work_dir.join("core.99")).unwrap(), b"core bytes");
        let copied = library_destination(&work_dir, &libraries[0]).unwrap();
        assert!(copied.starts_with(&work_dir));
        assert_eq!(fs::read(copied).unwrap(), b"elf");
    }

    #[tokio::test]
    async fn test_gather_leaves_core_already_in_work_dir()
    {
        let tmp = tempfile::tempdir().unwrap();
        let core = tmp.path().join("core");
        fs::write(&core, b"core bytes").unwrap();

        gather(&dump_in(tmp.path(), core), &[]).await.unwrap();
        assert!(!tmp.path().join("core.99").exists());
    }

    #[tokio::test]
    async fn test_gather_fails_on_copy_error_after_copying_the_rest()
    {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work");
        fs::create_dir(&work_dir).unwrap();
        let core = work_dir.join("core");
        fs::write(&core, b"core bytes").unwrap();

        let present = tmp.path().join("libpresent.so");
        fs::write(&present, b"elf").unwrap();
        let missing = tmp.path().join("libmissing.so");

        let libraries = vec![
            missing.to_string_lossy().into_owned(),
            present.to_string_lossy().into_owned(),
        ];
        match gather(&dump_in(&work_dir, core), &libraries).await {
            Err(CoreError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io error, got {other:?}"),
        }
        assert!(library_destination(&work_dir, &libraries[1]).unwrap().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_archive_packs_and_removes_work_dir()
    {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work");
        fs::create_dir(&work_dir).unwrap();
        fs::write(work_dir.join("core"), b"core bytes").unwrap();

        let tar_file = archive(&work_dir).await.unwrap();
        assert_eq!(tar_file, tmp.path().join("work.tar.gz"));
        assert!(tar_file.is_file());
        assert!(!work_dir.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_archive_reports_tar_failure()
    {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("never-created");

        assert!(matches!(archive(&work_dir).await, Err(CoreError::ArchiveFailed(_))));
    }
}
