//! # Fork and Monitor
//!
//! Parent-side control of dumping children.
//!
//! [`fork_core`] returns as soon as `fork()` does; the child writes its core
//! in the background. [`poll_child`] is a single `waitpid(WNOHANG)` so an
//! event loop can check for completion without ever blocking on a slow core
//! write. Timeouts are the caller's business: poll until a deadline of your
//! own.
//!
//! ## Example
//!
//! ```rust,no_run
//! use snapcore_core::monitor::{fork_core, poll_child};
//! use snapcore_core::types::{ChildStatus, DumpRequest};
//!
//! let request = DumpRequest::new("/tmp/dumpdir")?;
//! let child = fork_core(&request)?;
//! loop {
//!     match poll_child(child)? {
//!         ChildStatus::Pending => std::thread::sleep(std::time::Duration::from_millis(10)),
//!         ChildStatus::Completed(info) => {
//!             println!("child {child} finished: {info:?}");
//!             break;
//!         }
//!     }
//! }
//! # Ok::<(), snapcore_core::error::CoreError>(())
//! ```

#[cfg(unix)]
use std::io;

#[cfg(unix)]
use tracing::{debug, info, trace, warn};

use crate::error::{CoreError, CoreResult};
use crate::types::{ChildHandle, ChildStatus, DumpRequest};
#[cfg(unix)]
use crate::types::ExitInfo;

/// Fork a child that dumps core into `request`'s directory
///
/// The child never returns from this call (it crashes itself); the parent
/// gets the child's pid back immediately. Validation already happened when
/// `request` was built, so nothing is forked for a bad directory.
///
/// ## Errors
///
/// - `ForkFailed`: `fork()` returned -1 (process limit, out of memory)
/// - `Unsupported`: the target has no `fork()`
#[cfg(unix)]
pub fn fork_core(request: &DumpRequest) -> CoreResult<ChildHandle>
{
    info!(directory = ?request.directory(), "Forking dump child");

    let pid = unsafe { libc::fork() };
    match pid {
        0 => crate::child::crash_child(request),
        -1 => {
            let err = io::Error::last_os_error();
            warn!(error = %err, "fork() failed");
            Err(CoreError::ForkFailed(err))
        }
        pid => {
            // fork() only returns -1, 0 or a positive pid
            let handle = ChildHandle(pid.unsigned_abs());
            debug!(child_pid = handle.0, "Dump child started");
            Ok(handle)
        }
    }
}

#[cfg(not(unix))]
pub fn fork_core(_request: &DumpRequest) -> CoreResult<ChildHandle>
{
    Err(CoreError::Unsupported("fork_core"))
}

/// Check once, without blocking, whether `child` has exited
///
/// Reaps the child when it has exited, so a handle reports
/// [`ChildStatus::Completed`] at most once; later polls fail with
/// `ChildNotFound`.
///
/// ## Errors
///
/// - `ChildNotFound`: not a child of this process, already reaped, or not a
///   valid pid. This is never the same as "still running".
/// - `Io`: any other `waitpid()` failure
#[cfg(unix)]
pub fn poll_child(child: ChildHandle) -> CoreResult<ChildStatus>
{
    // pid 0 and negative pids address process groups in waitpid()
    let pid = libc::pid_t::try_from(child.0)
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or(CoreError::ChildNotFound(i64::from(child.0)))?;

    loop {
        let mut status: libc::c_int = 0;
        let rc = unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) };

        if rc == pid {
            let info = exit_info(status);
            debug!(child_pid = pid, ?info, "Dump child exited");
            return Ok(ChildStatus::Completed(info));
        }
        if rc == 0 {
            trace!(child_pid = pid, "Dump child still running");
            return Ok(ChildStatus::Pending);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::ECHILD) => return Err(CoreError::ChildNotFound(i64::from(pid))),
            _ => return Err(err.into()),
        }
    }
}

#[cfg(not(unix))]
pub fn poll_child(_child: ChildHandle) -> CoreResult<ChildStatus>
{
    Err(CoreError::Unsupported("poll_child"))
}

/// Decode a `waitpid()` status word
#[cfg(unix)]
fn exit_info(status: libc::c_int) -> ExitInfo
{
    if libc::WIFEXITED(status) {
        ExitInfo {
            code: Some(libc::WEXITSTATUS(status)),
            signal: None,
            core_dumped: false,
        }
    } else if libc::WIFSIGNALED(status) {
        ExitInfo {
            code: None,
            signal: Some(libc::WTERMSIG(status)),
            core_dumped: libc::WCOREDUMP(status),
        }
    } else {
        ExitInfo::default()
    }
}
