//! # Loaded Library Enumeration
//!
//! Lists every shared object mapped into the calling process, plus the main
//! executable, in the order the dynamic loader reports them.
//!
//! The list is meant to travel with a core file: symbolizing a core on
//! another machine needs the exact libraries that were mapped when it was
//! taken.
//!
//! Each platform has exactly one [`LibraryEnumerator`] implementation, picked
//! at compile time (see [`NativeEnumerator`]).

use tracing::{debug, trace};

pub use crate::platform::NativeEnumerator;

/// One entry reported by the dynamic loader
///
/// `path` is `None` when the loader reports the entry without a name. glibc
/// does this for the main program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRecord
{
    /// Filesystem path (or loader-assigned name such as `linux-vdso.so.1`)
    pub path: Option<String>,
}

impl LibraryRecord
{
    /// A named entry
    pub fn named(path: impl Into<String>) -> Self
    {
        Self { path: Some(path.into()) }
    }

    /// An entry the loader did not name
    pub fn unnamed() -> Self
    {
        Self { path: None }
    }
}

/// Capability: enumerate the modules loaded into this process
pub trait LibraryEnumerator
{
    /// Raw loader records in traversal order
    fn records(&self) -> Vec<LibraryRecord>;

    /// Loader records with the main executable's path filled in
    ///
    /// Never fails; entries that cannot be resolved are left out.
    fn loaded_libraries(&self) -> Vec<String>
    {
        let records = self.records();
        trace!(count = records.len(), "Loader records collected");
        resolve_records(records, self_executable_path)
    }
}

/// Turn loader records into the final path list
///
/// The first unnamed record is replaced by `resolve_self()`; if that returns
/// `None`, or for any further unnamed record, the slot is dropped.
/// `resolve_self` is only called when an unnamed record exists.
pub fn resolve_records<F>(records: Vec<LibraryRecord>, resolve_self: F) -> Vec<String>
where
    F: FnOnce() -> Option<String>,
{
    let mut resolve_self = Some(resolve_self);
    let mut libraries = Vec::with_capacity(records.len());

    for record in records {
        match record.path {
            Some(path) => libraries.push(path),
            None => {
                if let Some(exe) = resolve_self.take().and_then(|resolve| resolve()) {
                    libraries.push(exe);
                }
            }
        }
    }

    libraries
}

/// Resolved path of the running executable (`/proc/self/exe` on Linux)
fn self_executable_path() -> Option<String>
{
    match std::env::current_exe() {
        Ok(path) => Some(path.to_string_lossy().into_owned()),
        Err(e) => {
            debug!(error = %e, "Could not resolve the running executable");
            None
        }
    }
}

/// Enumerate the libraries loaded into this process with the native strategy
///
/// ## Example
///
/// ```rust,no_run
/// let libraries = snapcore_core::libraries::find_libraries();
/// for library in &libraries {
///     println!("{library}");
/// }
/// ```
pub fn find_libraries() -> Vec<String>
{
    let libraries = NativeEnumerator::default().loaded_libraries();
    debug!(count = libraries.len(), "Enumerated loaded libraries");
    libraries
}
