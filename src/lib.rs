//! # mmapper
//! A bookkeeping layer over the operating system's memory mapping primitives.
//! ## Usage
//! [`MappingRegistry::map`] obtains a region from a [`MapProvider`] and hands
//! back a [`MappedView`] covering exactly the requested length. Only a view
//! produced this way can later be passed to [`MappingRegistry::unmap`] or
//! [`MappingRegistry::remap_encrypted`]: empty views, sub-views, views over
//! foreign memory and views that were already released are rejected with
//! [`Error::InvalidArgument`] before any system call is made.
//! ## Example
//! ```no_run
//! use mmapper::{MappingRegistry, mmap::{DefaultProvider, MapFlags, ProtFlags}};
//!
//! let registry = MappingRegistry::new(DefaultProvider::new());
//! let mut view = registry
//!     .map(
//!         -1,
//!         0,
//!         4096,
//!         ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
//!         MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
//!     )
//!     .unwrap();
//! view.as_mut_slice().unwrap()[0] = 1;
//! unsafe { registry.unmap(&view) }.unwrap();
//! // A second release of the same view is refused.
//! assert!(unsafe { registry.unmap(&view) }.is_err());
//! ```
#![no_std]
extern crate alloc;
#[cfg(test)]
extern crate std;

#[cfg(not(unix))]
compile_error!("unsupport os");

pub mod errno;
mod error;
pub mod mmap;
mod os;
mod registry;
mod view;

pub use errno::Errno;
pub use error::Error;
pub use mmap::{MapFlags, MapProvider, ProtFlags, RawFd};
pub use registry::MappingRegistry;
pub use view::{MappedView, RegionKey};

#[cfg(feature = "global")]
use mmap::DefaultProvider;

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(feature = "global")]
static GLOBAL: MappingRegistry<DefaultProvider> = MappingRegistry::new(DefaultProvider::new());

/// The process-wide registry used by [`mmap`], [`munmap`] and [`mremap_encrypted`].
///
/// It is independent of any registry constructed with [`MappingRegistry::new`]:
/// views obtained from one are rejected by the other.
#[cfg(feature = "global")]
#[inline]
pub fn global() -> &'static MappingRegistry<DefaultProvider> {
    &GLOBAL
}

/// Maps `len` bytes through the global registry.
///
/// See [`MappingRegistry::map`].
#[cfg(feature = "global")]
#[inline]
pub fn mmap(
    fd: RawFd,
    offset: i64,
    len: usize,
    prot: ProtFlags,
    flags: MapFlags,
) -> Result<MappedView> {
    GLOBAL.map(fd, offset, len, prot, flags)
}

/// Unmaps a view obtained from [`mmap`].
///
/// # Safety
/// See [`MappingRegistry::unmap`].
#[cfg(feature = "global")]
#[inline]
pub unsafe fn munmap(view: &MappedView) -> Result<()> {
    unsafe { GLOBAL.unmap(view) }
}

/// Remaps a view obtained from [`mmap`] as encrypted.
///
/// # Safety
/// See [`MappingRegistry::remap_encrypted`].
#[cfg(feature = "global")]
#[inline]
pub unsafe fn mremap_encrypted(
    view: &MappedView,
    cryptid: u32,
    cpu_type: u32,
    cpu_subtype: u32,
) -> Result<()> {
    unsafe { GLOBAL.remap_encrypted(view, cryptid, cpu_type, cpu_subtype) }
}
