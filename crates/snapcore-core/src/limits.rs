//! # Resource Limits
//!
//! Raises the soft core-size and file-size limits of the calling process to
//! their hard ceiling before it dumps core.
//!
//! Both limits matter: a small `RLIMIT_FSIZE` truncates or suppresses a core
//! even when `RLIMIT_CORE` is generous.
//!
//! Everything here is a plain `getrlimit`/`setrlimit` syscall with no
//! allocation, so it is safe to call in a freshly forked child.
//!
//! ## References
//!
//! - [getrlimit(2) man page](https://man7.org/linux/man-pages/man2/getrlimit.2.html)

use std::io;

/// Resource kinds touched before a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind
{
    /// `RLIMIT_CORE`: largest core file the kernel will write
    CoreSize,
    /// `RLIMIT_FSIZE`: largest file the process may create
    FileSize,
}

impl ResourceKind
{
    /// Every kind that can block or truncate a core file
    pub const DUMP_LIMITS: [ResourceKind; 2] = [ResourceKind::CoreSize, ResourceKind::FileSize];
}

/// `(soft, hard)` limit pair for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimitPair
{
    /// Current (soft) limit
    pub soft: libc::rlim_t,
    /// Ceiling (hard) limit
    pub hard: libc::rlim_t,
}

impl ResourceLimitPair
{
    /// Whether the hard limit is `RLIM_INFINITY`
    pub fn is_unlimited(&self) -> bool
    {
        self.hard == libc::RLIM_INFINITY
    }

    /// The pair with the soft limit lifted to the hard limit
    ///
    /// Returns `None` when there is nothing to change. An unlimited hard limit
    /// is always applied, since `RLIM_INFINITY` is not guaranteed to compare
    /// greater than every finite value.
    pub fn raised(self) -> Option<Self>
    {
        if self.soft < self.hard || self.is_unlimited() {
            Some(ResourceLimitPair {
                soft: self.hard,
                hard: self.hard,
            })
        } else {
            None
        }
    }
}

/// Read the current limits for `kind`
pub fn current_limit(kind: ResourceKind) -> io::Result<ResourceLimitPair>
{
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // The resource constant's type differs between libc flavours, so each arm names it directly
    let rc = unsafe {
        match kind {
            ResourceKind::CoreSize => libc::getrlimit(libc::RLIMIT_CORE, &mut rlim),
            ResourceKind::FileSize => libc::getrlimit(libc::RLIMIT_FSIZE, &mut rlim),
        }
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(ResourceLimitPair {
        soft: rlim.rlim_cur,
        hard: rlim.rlim_max,
    })
}

fn set_limit(kind: ResourceKind, pair: ResourceLimitPair) -> io::Result<()>
{
    let rlim = libc::rlimit {
        rlim_cur: pair.soft,
        rlim_max: pair.hard,
    };
    let rc = unsafe {
        match kind {
            ResourceKind::CoreSize => libc::setrlimit(libc::RLIMIT_CORE, &rlim),
            ResourceKind::FileSize => libc::setrlimit(libc::RLIMIT_FSIZE, &rlim),
        }
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Raise the soft limit for `kind` to its hard limit
///
/// Failures are ignored: a dump taken with default limits is still worth
/// having, so nothing here may abort the dump.
pub fn raise_limit(kind: ResourceKind)
{
    if let Ok(pair) = current_limit(kind) {
        if let Some(raised) = pair.raised() {
            let _ = set_limit(kind, raised);
        }
    }
}

/// Raise every limit in [`ResourceKind::DUMP_LIMITS`]
pub fn raise_dump_limits()
{
    for kind in ResourceKind::DUMP_LIMITS {
        raise_limit(kind);
    }
}
