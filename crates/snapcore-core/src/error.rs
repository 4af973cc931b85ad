//! # Error Types
//!
//! Error handling for dump requests, child monitoring and dump sessions.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for snapcore operations
///
/// ## Error Categories
///
/// 1. **Caller input**: NoWorkingDirectory, PathTooLong, InvalidArgument.
///    Reported before any OS resource is consumed (no fork happens).
/// 2. **OS resources**: ForkFailed, ChildNotFound
/// 3. **Session**: WaitTimedOut, CoreNotFound, ArchiveFailed
/// 4. **Platform**: Unsupported
/// 5. **I/O errors**: Io
///
/// Best-effort steps inside the dumping child (raising limits, widening the
/// coredump filter, changing directory) never produce an error.
#[derive(Error, Debug)]
pub enum CoreError
{
    /// The dump directory argument was missing or empty
    #[error("no working directory specified")]
    NoWorkingDirectory,

    /// The dump directory does not fit the fixed-size directory buffer
    ///
    /// `len` is the length in bytes, `capacity` the buffer size including the
    /// terminating NUL, so the longest accepted path is `capacity - 1` bytes.
    #[error("working directory path too long: {len} bytes (buffer holds {capacity})")]
    PathTooLong
    {
        /// Length of the rejected path in bytes
        len: usize,
        /// Buffer capacity, terminator included
        capacity: usize,
    },

    /// Invalid argument passed to a snapcore function
    ///
    /// Examples:
    /// - A directory containing an interior NUL byte
    /// - A non-UTF-8 directory path
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `fork()` returned -1
    ///
    /// Usually `EAGAIN` (process limit reached) or `ENOMEM`.
    #[error("unable to create child process: {0}")]
    ForkFailed(#[source] io::Error),

    /// `waitpid()` does not know the given pid
    ///
    /// This happens when:
    /// - The child was already reaped by an earlier poll
    /// - The pid never belonged to a child of this process
    ///
    /// Callers must not treat this as "still running", or they will poll forever.
    #[error("child pid not found: {0}")]
    ChildNotFound(i64),

    /// A session deadline passed before the dumping child exited
    #[error("child {pid} still running after {waited:?}")]
    WaitTimedOut
    {
        /// The child that was being waited on
        pid: u32,
        /// How long the session waited
        waited: Duration,
    },

    /// The child exited but no core file was found where one was expected
    #[error("no core file created in {}", .0.display())]
    CoreNotFound(PathBuf),

    /// Packaging a collected core failed
    #[error("failed to archive collected core: {0}")]
    ArchiveFailed(String),

    /// The current target has no process/core support
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for `Result<T, CoreError>`
///
/// ```rust
/// use snapcore_core::error::CoreResult;
/// fn foo() -> CoreResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type CoreResult<T> = std::result::Result<T, CoreError>;
