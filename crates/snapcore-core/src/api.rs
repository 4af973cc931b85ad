//! # Boundary Operations
//!
//! The three calls an embedding host makes, with host-shaped arguments and
//! results:
//!
//! - [`fork_core`]: `directory -> { child_pid }`
//! - [`check_child`]: `child_pid -> bool`
//! - [`find_libraries`]: `-> [path]`
//!
//! They are thin wrappers over [`crate::monitor`] and [`crate::libraries`].
//!
//! ## Unsupported targets
//!
//! Where there is no `fork()`, [`fork_core`] and [`check_child`] do not
//! silently do nothing: they return [`CoreError::Unsupported`], so a host
//! never waits on a dump that was never started. [`find_libraries`] returns
//! an empty list there.

use crate::error::{CoreError, CoreResult};
use crate::monitor;
use crate::types::{ChildHandle, DumpRequest, ForkOutcome};

/// Start a core dump into `directory`
///
/// `None` stands for a missing (or non-string) host argument.
///
/// ## Errors
///
/// - `NoWorkingDirectory`: `directory` is `None` or empty
/// - `PathTooLong`: `directory` does not fit the directory buffer
/// - `ForkFailed`: the child could not be created
pub fn fork_core(directory: Option<&str>) -> CoreResult<ForkOutcome>
{
    let directory = directory.ok_or(CoreError::NoWorkingDirectory)?;
    let request = DumpRequest::new(directory)?;
    monitor::fork_core(&request).map(ForkOutcome::from)
}

/// `true` once the child has exited, `false` while it is still running
///
/// Reaps the child, so only the first `true` is ever reported for a pid.
///
/// ## Errors
///
/// - `ChildNotFound`: unknown, already reaped, or out-of-range pid
pub fn check_child(child_pid: i64) -> CoreResult<bool>
{
    let pid = u32::try_from(child_pid).map_err(|_| CoreError::ChildNotFound(child_pid))?;
    Ok(monitor::poll_child(ChildHandle(pid))?.is_completed())
}

/// Every library mapped into this process, main executable included
pub fn find_libraries() -> Vec<String>
{
    crate::libraries::find_libraries()
}
