//! Dump request, child handle and child status types.

use std::ffi::{CStr, CString};
use std::fmt;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Size of the directory buffer handed to the dumping child, terminator included
///
/// The longest accepted directory is therefore `DIRECTORY_CAPACITY - 1` bytes.
/// The path is copied into the child before `fork()`, so nothing has to be
/// allocated or validated on the child side.
pub const DIRECTORY_CAPACITY: usize = 32;

/// Caller input for one core dump
///
/// Holds the directory the child switches into before crashing. The kernel
/// writes the core file relative to the crashing process's working directory
/// (subject to `core_pattern` on Linux and `kern.corefile` on macOS).
///
/// ## Invariants
///
/// - Non-empty
/// - Shorter than [`DIRECTORY_CAPACITY`] bytes
/// - No interior NUL byte
///
/// ## Example
///
/// ```rust
/// use snapcore_core::types::DumpRequest;
///
/// let request = DumpRequest::new("/tmp/dumpdir")?;
/// assert_eq!(request.directory().to_bytes(), b"/tmp/dumpdir");
/// # Ok::<(), snapcore_core::error::CoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest
{
    directory: CString,
}

impl DumpRequest
{
    /// Validate `directory` and build a request
    ///
    /// ## Errors
    ///
    /// - `NoWorkingDirectory`: the path is empty
    /// - `PathTooLong`: the path needs more than `DIRECTORY_CAPACITY - 1` bytes
    /// - `InvalidArgument`: interior NUL byte, or a non-UTF-8 path on targets
    ///   where paths are not plain bytes
    pub fn new(directory: impl AsRef<Path>) -> CoreResult<Self>
    {
        let bytes = path_bytes(directory.as_ref())?;

        if bytes.is_empty() {
            return Err(CoreError::NoWorkingDirectory);
        }
        if bytes.len() >= DIRECTORY_CAPACITY {
            return Err(CoreError::PathTooLong {
                len: bytes.len(),
                capacity: DIRECTORY_CAPACITY,
            });
        }

        let directory = CString::new(bytes)
            .map_err(|e| CoreError::InvalidArgument(format!("Invalid working directory: {e}")))?;
        Ok(Self { directory })
    }

    /// The validated directory as a C string, ready for `chdir()`
    pub fn directory(&self) -> &CStr
    {
        &self.directory
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> CoreResult<Vec<u8>>
{
    use std::os::unix::ffi::OsStrExt;

    Ok(path.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> CoreResult<Vec<u8>>
{
    path.to_str()
        .map(|s| s.as_bytes().to_vec())
        .ok_or_else(|| CoreError::InvalidArgument(format!("non UTF-8 working directory: {}", path.display())))
}

/// Process identifier of a dumping child
///
/// Returned by the fork controller and passed back to `poll_child`. The
/// handle does not own the process; it only names it. Once a poll has
/// reported [`ChildStatus::Completed`] the child is reaped and the handle is
/// stale (polling it again fails with `ChildNotFound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildHandle(pub u32);

impl ChildHandle
{
    /// The raw pid
    pub fn pid(&self) -> u32
    {
        self.0
    }
}

impl From<u32> for ChildHandle
{
    fn from(pid: u32) -> Self
    {
        ChildHandle(pid)
    }
}

impl From<ChildHandle> for u32
{
    fn from(handle: ChildHandle) -> Self
    {
        handle.0
    }
}

impl fmt::Display for ChildHandle
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// How a reaped child ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo
{
    /// Exit code, if the child called `exit()`
    pub code: Option<i32>,
    /// Terminating signal, if the child was killed by one
    pub signal: Option<i32>,
    /// Whether the kernel reports having written a core for this child
    ///
    /// `false` does not prove that no core exists: with a piped
    /// `core_pattern` the helper decides.
    pub core_dumped: bool,
}

impl ExitInfo
{
    /// The child was terminated by a signal rather than exiting normally
    pub fn killed_by_signal(&self) -> bool
    {
        self.signal.is_some()
    }
}

/// Result of a single non-blocking poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus
{
    /// The child is still running (writing its core)
    Pending,
    /// The child has exited and has now been reaped
    Completed(ExitInfo),
}

impl ChildStatus
{
    /// `true` once the child has exited
    pub fn is_completed(&self) -> bool
    {
        matches!(self, ChildStatus::Completed(_))
    }
}

/// Boundary result of a successful fork: `{ child_pid }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkOutcome
{
    /// Pid of the dumping child
    pub child_pid: u32,
}

impl From<ChildHandle> for ForkOutcome
{
    fn from(handle: ChildHandle) -> Self
    {
        ForkOutcome { child_pid: handle.0 }
    }
}
