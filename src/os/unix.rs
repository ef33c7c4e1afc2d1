use crate::{
    errno::Errno,
    mmap::{MapFlags, MapProvider, ProtFlags, RawFd},
};
use core::{
    ffi::{c_int, c_void},
    ptr::NonNull,
};
use libc::{mmap, munmap};

/// A [`MapProvider`] backed by the C library.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcProvider;

impl LibcProvider {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(target_vendor = "apple")]
unsafe extern "C" {
    // Exported by libSystem but not declared by the libc crate.
    fn mremap_encrypted(
        addr: *mut c_void,
        len: usize,
        cryptid: u32,
        cputype: u32,
        cpusubtype: u32,
    ) -> c_int;
}

impl MapProvider for LibcProvider {
    unsafe fn mmap(
        &self,
        addr: usize,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        fd: RawFd,
        offset: i64,
    ) -> Result<NonNull<u8>, Errno> {
        let offset = to_off_t(offset)?;
        let ptr = unsafe { mmap(addr as _, len, prot.bits(), flags.bits(), fd, offset) };
        if core::ptr::eq(ptr, libc::MAP_FAILED) {
            return Err(last_errno());
        }
        // mmap never hands out the null page unless asked to with MAP_FIXED.
        NonNull::new(ptr.cast::<u8>()).ok_or(Errno::EINVAL)
    }

    unsafe fn munmap(&self, addr: NonNull<u8>, len: usize) -> Result<(), Errno> {
        let res = unsafe { munmap(addr.as_ptr().cast::<c_void>(), len) };
        if res != 0 {
            return Err(last_errno());
        }
        Ok(())
    }

    #[cfg(target_vendor = "apple")]
    unsafe fn mremap_encrypted(
        &self,
        addr: NonNull<u8>,
        len: usize,
        cryptid: u32,
        cpu_type: u32,
        cpu_subtype: u32,
    ) -> Result<(), Errno> {
        let res = unsafe {
            mremap_encrypted(
                addr.as_ptr().cast::<c_void>(),
                len,
                cryptid,
                cpu_type,
                cpu_subtype,
            )
        };
        if res != 0 {
            return Err(last_errno());
        }
        Ok(())
    }

    #[cfg(not(target_vendor = "apple"))]
    unsafe fn mremap_encrypted(
        &self,
        _addr: NonNull<u8>,
        _len: usize,
        _cryptid: u32,
        _cpu_type: u32,
        _cpu_subtype: u32,
    ) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }
}

/// Narrows a file offset to the C library's `off_t`.
///
/// On 32-bit targets without large-file support `off_t` is 32 bits wide, and
/// an offset that does not fit is refused rather than wrapped.
#[inline]
fn to_off_t(offset: i64) -> Result<libc::off_t, Errno> {
    libc::off_t::try_from(offset).map_err(|_| Errno::EINVAL)
}

/// Reads the calling thread's `errno`.
#[cold]
fn last_errno() -> Errno {
    let raw = unsafe { *errno_location() };
    // A failing call that left errno untouched still has to report something.
    Errno::from_raw(raw).unwrap_or(Errno::EINVAL)
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "fuchsia", target_os = "hurd"))] {
        #[inline]
        unsafe fn errno_location() -> *mut c_int {
            unsafe { libc::__errno_location() }
        }
    } else if #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))] {
        #[inline]
        unsafe fn errno_location() -> *mut c_int {
            unsafe { libc::__errno() }
        }
    } else if #[cfg(any(target_vendor = "apple", target_os = "freebsd"))] {
        #[inline]
        unsafe fn errno_location() -> *mut c_int {
            unsafe { libc::__error() }
        }
    } else {
        compile_error!("no errno accessor for this target");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_round_trip() {
        let provider = LibcProvider;
        let len = 4096;
        unsafe {
            let ptr = provider
                .mmap(
                    0,
                    len,
                    ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                    MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
                    -1,
                    0,
                )
                .unwrap();
            ptr.as_ptr().write(0xaa);
            assert_eq!(ptr.as_ptr().read(), 0xaa);
            provider.munmap(ptr, len).unwrap();
        }
    }

    #[test]
    fn bad_descriptor_reports_errno() {
        let err = unsafe {
            LibcProvider.mmap(
                0,
                4096,
                ProtFlags::PROT_READ,
                MapFlags::MAP_PRIVATE,
                -1,
                0,
            )
        }
        .unwrap_err();
        assert_eq!(err.raw(), libc::EBADF);
    }

    #[test]
    fn offsets_are_never_truncated() {
        assert_eq!(to_off_t(0), Ok(0));
        assert_eq!(to_off_t(-1), Ok(-1));
        let large = 0x1_0000_0000i64;
        if size_of::<libc::off_t>() < size_of::<i64>() {
            assert_eq!(to_off_t(large), Err(Errno::EINVAL));
            assert_eq!(to_off_t(i64::MIN), Err(Errno::EINVAL));
        } else {
            assert_eq!(to_off_t(large).map(i64::from), Ok(large));
        }
    }

    #[cfg(not(target_vendor = "apple"))]
    #[test]
    fn remap_is_unsupported() {
        let mut byte = 0u8;
        let err = unsafe {
            LibcProvider.mremap_encrypted(NonNull::from(&mut byte), 1, 0, 0, 0)
        }
        .unwrap_err();
        assert_eq!(err, Errno::ENOSYS);
    }
}
