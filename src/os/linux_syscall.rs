use crate::{
    errno::Errno,
    mmap::{MapFlags, MapProvider, ProtFlags, RawFd},
};
use core::ptr::NonNull;
use syscalls::Sysno;

/// A [`MapProvider`] issuing raw Linux system calls, bypassing the C library.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallProvider;

impl SyscallProvider {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

/// Page size assumed by `mmap2`, whose offset argument is in 4096-byte units.
#[cfg(target_pointer_width = "32")]
const MMAP2_UNIT: i64 = 4096;

impl MapProvider for SyscallProvider {
    unsafe fn mmap(
        &self,
        addr: usize,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        fd: RawFd,
        offset: i64,
    ) -> Result<NonNull<u8>, Errno> {
        #[cfg(target_pointer_width = "32")]
        let syscall = Sysno::mmap2;
        #[cfg(not(target_pointer_width = "32"))]
        let syscall = Sysno::mmap;
        let offset = syscall_offset(offset)?;
        let ptr = unsafe {
            from_ret(syscalls::raw_syscall!(
                syscall,
                addr,
                len,
                prot.bits(),
                flags.bits(),
                fd,
                offset
            ))?
        };
        NonNull::new(ptr as *mut u8).ok_or(Errno::EINVAL)
    }

    unsafe fn munmap(&self, addr: NonNull<u8>, len: usize) -> Result<(), Errno> {
        unsafe {
            from_ret(syscalls::raw_syscall!(Sysno::munmap, addr.as_ptr(), len))?;
        }
        Ok(())
    }

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

/// Converts a file offset to the syscall argument.
///
/// `mmap2` takes the offset in 4096-byte units, so an unaligned offset cannot
/// be expressed. Offsets that do not fit the register are refused rather than
/// wrapped.
#[inline]
fn syscall_offset(offset: i64) -> Result<isize, Errno> {
    #[cfg(target_pointer_width = "32")]
    let offset = {
        if offset % MMAP2_UNIT != 0 {
            return Err(Errno::EINVAL);
        }
        offset / MMAP2_UNIT
    };
    isize::try_from(offset).map_err(|_| Errno::EINVAL)
}

/// Converts a raw syscall return value to a result.
#[inline(always)]
fn from_ret(value: usize) -> Result<usize, Errno> {
    if value > -4096isize as usize {
        // Truncation of the error value is guaranteed to never occur due to
        // the above check. This is the same check that musl uses:
        // https://git.musl-libc.org/cgit/musl/tree/src/internal/syscall_ret.c?h=v1.1.15
        let raw = -(value as isize) as core::ffi::c_int;
        return Err(Errno::from_raw(raw).unwrap_or(Errno::EINVAL));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_returns_are_errno() {
        assert_eq!(from_ret(-(libc::EAGAIN as isize) as usize), Err(Errno::EAGAIN));
        assert_eq!(from_ret(0x1000), Ok(0x1000));
    }

    #[test]
    fn offsets_are_never_truncated() {
        assert_eq!(syscall_offset(0), Ok(0));
        #[cfg(not(target_pointer_width = "32"))]
        assert_eq!(syscall_offset(0x1_0000_0000), Ok(0x1_0000_0000));
        #[cfg(target_pointer_width = "32")]
        {
            assert_eq!(syscall_offset(0x1_0000_0000), Ok(0x10_0000));
            assert_eq!(syscall_offset(4097), Err(Errno::EINVAL));
            assert_eq!(syscall_offset(i64::MAX & !0xfff), Err(Errno::EINVAL));
        }
    }

    #[test]
    fn anonymous_round_trip() {
        let provider = SyscallProvider;
        unsafe {
            let ptr = provider
                .mmap(
                    0,
                    8192,
                    ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                    MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
                    -1,
                    0,
                )
                .unwrap();
            ptr.as_ptr().add(8191).write(7);
            provider.munmap(ptr, 8192).unwrap();
        }
    }
}
