//! # Linux Implementation
//!
//! Library enumeration through the dynamic linker and the per-process
//! coredump filter.
//!
//! ## Library enumeration
//!
//! `dl_iterate_phdr()` calls us back once per loaded object, in load order.
//! glibc reports the main program with an empty `dlpi_name`, which becomes an
//! unnamed [`LibraryRecord`] and is later resolved to the executable path.
//!
//! ## Coredump filter
//!
//! `/proc/self/coredump_filter` is a bit mask selecting which kinds of
//! mappings go into a core. Bits are documented in core(5):
//!
//! | bit | mappings                 |
//! |-----|--------------------------|
//! | 0   | anonymous private        |
//! | 1   | anonymous shared         |
//! | 2   | file-backed private      |
//! | 3   | file-backed shared       |
//! | 4   | ELF headers              |
//! | 5   | private huge pages       |
//! | 6   | shared huge pages        |
//! | 7   | private DAX pages        |
//! | 8   | shared DAX pages         |
//!
//! Bits the running kernel does not know are ignored on write.

use std::ffi::{c_void, CStr};

use libc::{c_int, size_t};

use crate::libraries::{LibraryEnumerator, LibraryRecord};

/// Coredump filter bits (see core(5))
pub mod filter
{
    /// Anonymous private memory
    pub const ANON_PRIVATE: u32 = 1 << 0;
    /// Anonymous shared memory
    pub const ANON_SHARED: u32 = 1 << 1;
    /// File-backed private memory
    pub const FILE_PRIVATE: u32 = 1 << 2;
    /// File-backed shared memory
    pub const FILE_SHARED: u32 = 1 << 3;
    /// ELF headers of file-backed mappings
    pub const ELF_HEADERS: u32 = 1 << 4;
    /// Private huge pages
    pub const HUGETLB_PRIVATE: u32 = 1 << 5;
    /// Shared huge pages
    pub const HUGETLB_SHARED: u32 = 1 << 6;
    /// Private DAX pages
    pub const DAX_PRIVATE: u32 = 1 << 7;
    /// Shared DAX pages
    pub const DAX_SHARED: u32 = 1 << 8;

    /// Every documented mapping class
    pub const ALL: u32 = ANON_PRIVATE
        | ANON_SHARED
        | FILE_PRIVATE
        | FILE_SHARED
        | ELF_HEADERS
        | HUGETLB_PRIVATE
        | HUGETLB_SHARED
        | DAX_PRIVATE
        | DAX_SHARED;
}

const COREDUMP_FILTER_PATH: &[u8] = b"/proc/self/coredump_filter\0";

/// Longest rendering of a `u32` mask: `0x` + 8 digits + newline
const MASK_TEXT_LEN: usize = 11;

/// Render `mask` as `0x<hex>\n` into `buf` without allocating
pub(crate) fn format_filter_mask(mask: u32, buf: &mut [u8; MASK_TEXT_LEN]) -> &[u8]
{
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut digits = [0u8; 8];
    let mut count = 0;
    let mut value = mask;
    loop {
        digits[count] = HEX[(value & 0xf) as usize];
        count += 1;
        value >>= 4;
        if value == 0 {
            break;
        }
    }

    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..count {
        buf[2 + i] = digits[count - 1 - i];
    }
    buf[2 + count] = b'\n';
    &buf[..3 + count]
}

/// Include every mapping class in this process's core
///
/// Runs inside the dumping child, so it only uses raw syscalls. Failure
/// (no procfs, read-only mount, old kernel) leaves the default filter.
pub(crate) fn widen_coredump_filter()
{
    let mut buf = [0u8; MASK_TEXT_LEN];
    let text = format_filter_mask(filter::ALL, &mut buf);

    unsafe {
        let fd = libc::open(COREDUMP_FILTER_PATH.as_ptr().cast(), libc::O_WRONLY | libc::O_CLOEXEC);
        if fd < 0 {
            return;
        }
        let _ = libc::write(fd, text.as_ptr().cast(), text.len());
        let _ = libc::close(fd);
    }
}

/// Enumerator backed by `dl_iterate_phdr()`
#[derive(Debug, Default, Clone, Copy)]
pub struct DlIterateEnumerator;

impl LibraryEnumerator for DlIterateEnumerator
{
    fn records(&self) -> Vec<LibraryRecord>
    {
        let mut records: Vec<LibraryRecord> = Vec::new();
        unsafe {
            libc::dl_iterate_phdr(Some(collect_record), (&mut records as *mut Vec<LibraryRecord>).cast());
        }
        records
    }
}

/// `dl_iterate_phdr` callback: append one record, never abort the walk
unsafe extern "C" fn collect_record(info: *mut libc::dl_phdr_info, _size: size_t, data: *mut c_void) -> c_int
{
    if info.is_null() || data.is_null() {
        return 0;
    }

    let records = &mut *data.cast::<Vec<LibraryRecord>>();
    let name = (*info).dlpi_name;
    let record = if name.is_null() || *name == 0 {
        LibraryRecord::unnamed()
    } else {
        LibraryRecord::named(CStr::from_ptr(name).to_string_lossy().into_owned())
    };
    records.push(record);

    0
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_filter_all_covers_documented_bits()
    {
        assert_eq!(filter::ALL, 0x1ff);
    }

    #[test]
    fn test_format_filter_mask()
    {
        let mut buf = [0u8; MASK_TEXT_LEN];
        assert_eq!(format_filter_mask(filter::ALL, &mut buf), b"0x1ff\n");
        assert_eq!(format_filter_mask(0, &mut buf), b"0x0\n");
        assert_eq!(format_filter_mask(u32::MAX, &mut buf), b"0xffffffff\n");
    }

    #[test]
    fn test_records_are_not_empty()
    {
        assert!(!DlIterateEnumerator.records().is_empty());
    }

    #[cfg(target_env = "gnu")]
    #[test]
    fn test_glibc_reports_main_program_unnamed_first()
    {
        let records = DlIterateEnumerator.records();
        assert_eq!(records[0], LibraryRecord::unnamed());
    }
}
