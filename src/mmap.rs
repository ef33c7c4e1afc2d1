//! Memory mapping primitives consumed by the registry.
//!
//! This module defines the protection and mapping flags passed through to the
//! operating system, and the [`MapProvider`] trait that performs the actual
//! `mmap`/`munmap`/`mremap_encrypted` calls. The registry never issues a
//! system call itself; it only talks to a provider.
//!
//! # Safety
//! Memory mapping involves direct manipulation of the process's address space.
//! Providers must return a base address that stays valid for the whole length
//! until it is unmapped.

pub use crate::os::*;

use crate::errno::Errno;
use bitflags::bitflags;
use core::{ffi::c_int, ptr::NonNull};

/// A raw file descriptor as understood by the host ABI.
pub type RawFd = c_int;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    /// Memory protection flags for controlling access permissions.
    ///
    /// The values are those of the host ABI. Bits not named here can still be
    /// passed with [`ProtFlags::from_bits_retain`].
    pub struct ProtFlags: c_int {
        /// No access allowed. Useful for reserving address space.
        const PROT_NONE = libc::PROT_NONE;

        /// Allow reading from the memory region.
        const PROT_READ = libc::PROT_READ;

        /// Allow writing to the memory region.
        const PROT_WRITE = libc::PROT_WRITE;

        /// Allow executing code in the memory region.
        const PROT_EXEC = libc::PROT_EXEC;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    /// Memory mapping configuration flags.
    ///
    /// The values are those of the host ABI. Bits not named here can still be
    /// passed with [`MapFlags::from_bits_retain`].
    pub struct MapFlags: c_int {
        /// Share the mapping with other processes mapping the same object.
        const MAP_SHARED = libc::MAP_SHARED;

        /// Create a private copy-on-write mapping. Changes are not visible to other processes.
        const MAP_PRIVATE = libc::MAP_PRIVATE;

        /// Place the mapping at exactly the specified address. Fails if the address is already in use.
        const MAP_FIXED = libc::MAP_FIXED;

        /// Create an anonymous mapping not backed by any file. The descriptor should be `-1`.
        const MAP_ANONYMOUS = libc::MAP_ANON;
    }
}

/// Raw access to the operating system's mapping primitives.
///
/// A provider is the only place where system calls happen. It reports failures
/// as bare [`Errno`] values; the registry forwards them to its caller without
/// adding context.
///
/// # Safety
/// All methods are unsafe because they manipulate the process's virtual address space.
/// Implementors must be callable from several threads at once.
///
/// # Example
/// ```rust,ignore
/// struct MyProvider;
///
/// impl MapProvider for MyProvider {
///     unsafe fn mmap(
///         &self,
///         addr: usize,
///         len: usize,
///         prot: ProtFlags,
///         flags: MapFlags,
///         fd: RawFd,
///         offset: i64,
///     ) -> Result<NonNull<u8>, Errno> {
///         // Platform-specific implementation
///         todo!()
///     }
///
///     // Implement other required methods...
/// }
/// ```
pub trait MapProvider {
    /// Maps `len` bytes of `fd` starting at `offset`, or anonymous memory.
    ///
    /// # Arguments
    /// * `addr` - Placement hint. The registry always passes `0` so the system chooses.
    /// * `len` - Size of the mapping in bytes. Never zero.
    /// * `prot` - Memory protection flags.
    /// * `flags` - Mapping configuration flags.
    /// * `fd` - File descriptor, or `-1` for anonymous mappings.
    /// * `offset` - File offset (must be page-aligned).
    ///
    /// # Returns
    /// The base address of a region that is at least `len` bytes long.
    ///
    /// # Safety
    /// This function manipulates the process's address space.
    unsafe fn mmap(
        &self,
        addr: usize,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        fd: RawFd,
        offset: i64,
    ) -> Result<NonNull<u8>, Errno>;

    /// Unmaps a region previously returned by [`MapProvider::mmap`].
    ///
    /// # Safety
    /// `addr` and `len` must match the original mapping. The region must not be accessed afterwards.
    unsafe fn munmap(&self, addr: NonNull<u8>, len: usize) -> Result<(), Errno>;

    /// Remaps a region as encrypted with the given crypt id and CPU type.
    ///
    /// Only Darwin offers this primitive; other providers report `ENOSYS`.
    ///
    /// # Safety
    /// `addr` and `len` must match the original mapping. The old contents must
    /// not be relied upon afterwards.
    unsafe fn mremap_encrypted(
        &self,
        addr: NonNull<u8>,
        len: usize,
        cryptid: u32,
        cpu_type: u32,
        cpu_subtype: u32,
    ) -> Result<(), Errno>;
}

impl<P: MapProvider + ?Sized> MapProvider for &P {
    #[inline]
    unsafe fn mmap(
        &self,
        addr: usize,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        fd: RawFd,
        offset: i64,
    ) -> Result<NonNull<u8>, Errno> {
        unsafe { (**self).mmap(addr, len, prot, flags, fd, offset) }
    }

    #[inline]
    unsafe fn munmap(&self, addr: NonNull<u8>, len: usize) -> Result<(), Errno> {
        unsafe { (**self).munmap(addr, len) }
    }

    #[inline]
    unsafe fn mremap_encrypted(
        &self,
        addr: NonNull<u8>,
        len: usize,
        cryptid: u32,
        cpu_type: u32,
        cpu_subtype: u32,
    ) -> Result<(), Errno> {
        unsafe { (**self).mremap_encrypted(addr, len, cryptid, cpu_type, cpu_subtype) }
    }
}
