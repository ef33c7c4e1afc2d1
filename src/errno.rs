//! OS error codes reported by a [`MapProvider`](crate::mmap::MapProvider).

use core::{
    ffi::c_int,
    fmt::{Debug, Display},
};

/// An opaque error number returned by the operating system.
///
/// The registry never interprets these beyond the three common values exposed
/// as associated constants; every other code is passed through untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Errno(c_int);

impl Errno {
    /// Resource temporarily unavailable.
    pub const EAGAIN: Errno = Errno(libc::EAGAIN);
    /// Invalid argument.
    pub const EINVAL: Errno = Errno(libc::EINVAL);
    /// No such file or directory.
    pub const ENOENT: Errno = Errno(libc::ENOENT);
    /// Function not implemented on this platform.
    pub const ENOSYS: Errno = Errno(libc::ENOSYS);

    /// Wraps a raw error number. `0` means success and yields `None`.
    #[inline]
    pub const fn from_raw(raw: c_int) -> Option<Errno> {
        if raw == 0 { None } else { Some(Errno(raw)) }
    }

    /// The raw error number.
    #[inline]
    pub const fn raw(self) -> c_int {
        self.0
    }

    /// Whether this is one of the frequently seen codes (`EAGAIN`, `EINVAL`, `ENOENT`).
    #[inline]
    pub const fn is_common(self) -> bool {
        matches!(self.0, libc::EAGAIN | libc::EINVAL | libc::ENOENT)
    }

    fn name(self) -> Option<&'static str> {
        match self.0 {
            libc::EAGAIN => Some("EAGAIN"),
            libc::EINVAL => Some("EINVAL"),
            libc::ENOENT => Some("ENOENT"),
            libc::ENOSYS => Some("ENOSYS"),
            libc::ENOMEM => Some("ENOMEM"),
            libc::EBADF => Some("EBADF"),
            libc::EACCES => Some("EACCES"),
            libc::EPERM => Some("EPERM"),
            _ => None,
        }
    }
}

impl Debug for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "Errno({})", self.0),
        }
    }
}

impl Display for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (os error {})", self.0),
            None => write!(f, "os error {}", self.0),
        }
    }
}
