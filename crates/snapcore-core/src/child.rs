//! # Dumping Child
//!
//! The code that runs in the forked child. It never returns: the child moves
//! into the dump directory, lifts its limits, widens the coredump filter where
//! the kernel has one, and kills itself with `SIGSEGV` so the kernel writes a
//! core exactly as it would for a real crash.
//!
//! ## Fork safety
//!
//! The parent may have had other threads holding locks (allocator, logging,
//! stdio) at the moment of `fork()`. Only the forking thread survives in the
//! child, so anything here must be a raw syscall: no allocation, no
//! `tracing`, no `std::fs`. All inputs are prepared by the parent.

use crate::limits::raise_dump_limits;
use crate::types::DumpRequest;

/// Dump core into `request`'s directory by crashing this process
///
/// Every step before the signal is best effort. If `chdir()` fails the core
/// lands in the inherited working directory instead.
pub(crate) fn crash_child(request: &DumpRequest) -> !
{
    unsafe {
        let _ = libc::chdir(request.directory().as_ptr());
    }

    raise_dump_limits();

    #[cfg(any(target_os = "linux", target_os = "android"))]
    crate::platform::linux::widen_coredump_filter();

    deliver_fatal_signal()
}

/// Raise `SIGSEGV` with its default (core-dumping) disposition
///
/// The disposition is reset first: handlers survive `fork()`, and the Rust
/// runtime's own `SIGSEGV` handler ignores a raised signal that did not come
/// from a guard page.
fn deliver_fatal_signal() -> !
{
    unsafe {
        libc::signal(libc::SIGSEGV, libc::SIG_DFL);

        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGSEGV);
        libc::pthread_sigmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut());

        libc::raise(libc::SIGSEGV);

        // Still alive: SIGABRT also dumps core by default
        libc::abort()
    }
}
