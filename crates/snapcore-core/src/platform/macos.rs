//! # macOS Implementation
//!
//! Library enumeration through the dyld image table.
//!
//! dyld names every image, the main executable included (index 0), so no
//! self-path fallback is needed. macOS has no per-process coredump filter,
//! and the core location is the system-wide `kern.corefile` sysctl
//! (`/cores/core.%P` by default), which only root can change.

use std::ffi::CStr;

use crate::libraries::{LibraryEnumerator, LibraryRecord};

/// Enumerator backed by `_dyld_get_image_name()`
#[derive(Debug, Default, Clone, Copy)]
pub struct DyldEnumerator;

impl LibraryEnumerator for DyldEnumerator
{
    fn records(&self) -> Vec<LibraryRecord>
    {
        let mut records = Vec::new();
        let mut index: u32 = 0;
        loop {
            // Returns NULL once index runs past the last image
            let name = unsafe { libc::_dyld_get_image_name(index) };
            if name.is_null() {
                break;
            }
            let path = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
            records.push(LibraryRecord::named(path));
            index += 1;
        }
        records
    }
}
