//! # snapcore-core
//!
//! On-demand core dumps of a live process, and the list of libraries it has
//! loaded.
//!
//! A dump forks the process; the child moves into a chosen directory, lifts
//! its core/file size limits and kills itself with `SIGSEGV`, so the kernel
//! writes an ordinary crash core while the parent keeps running. The parent
//! gets the child's pid back immediately and polls it without blocking.
//!
//! - [`monitor`]: fork a dumping child, poll it
//! - [`libraries`]: enumerate loaded libraries (per-platform in [`platform`])
//! - [`api`]: the same operations with host-shaped arguments
//! - [`session`]: async create/collect helpers on top of the primitives
//!
//! ## Platform Support
//!
//! - **Linux**: `fork`, `/proc/self/coredump_filter`, `dl_iterate_phdr`
//! - **macOS**: `fork`, dyld image table
//! - **Windows**: stubs only (`Unsupported`, empty library list)
//!
//! ## Why unsafe code is needed
//!
//! `fork`, `waitpid`, `setrlimit`, signal and loader calls are raw libc
//! functions. They are wrapped in safe functions here; only those wrappers
//! contain `unsafe` blocks.

#![allow(unsafe_code)] // Required for libc process, signal and loader APIs

pub mod api;
#[cfg(unix)]
mod child;
pub mod error;
pub mod libraries;
#[cfg(unix)]
pub mod limits;
pub mod monitor;
pub mod platform;
pub mod prelude;
pub mod session;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use libraries::{find_libraries, LibraryEnumerator, LibraryRecord, NativeEnumerator};
pub use monitor::{fork_core, poll_child};
pub use types::{ChildHandle, ChildStatus, DumpRequest, ExitInfo, ForkOutcome};
