//! # Platform-Specific Implementations
//!
//! Each platform has its own submodule with the native library enumerator
//! and whatever dump tweaks the kernel offers:
//!
//! - **Linux / Android**: `dl_iterate_phdr()` over the ELF program headers,
//!   plus `/proc/self/coredump_filter`
//!   - See: [dl_iterate_phdr(3) man page](https://man7.org/linux/man-pages/man3/dl_iterate_phdr.3.html)
//!   - See: [core(5) man page](https://man7.org/linux/man-pages/man5/core.5.html)
//! - **macOS / iOS**: the dyld image table (`_dyld_get_image_name()`)
//!   - See: [dyld(3) man page](https://developer.apple.com/library/archive/documentation/System/Conceptual/ManPages_iPhoneOS/man3/dyld.3.html)
//! - **Everything else**: an enumerator that reports nothing
//!
//! Exactly one of them is compiled and re-exported as `NativeEnumerator`.

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub mod macos;

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios")))]
pub mod unsupported;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use linux::DlIterateEnumerator as NativeEnumerator;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use macos::DyldEnumerator as NativeEnumerator;
#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios")))]
pub use unsupported::NullEnumerator as NativeEnumerator;
