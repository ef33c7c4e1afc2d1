//! The mapping registry.
//!
//! The registry records every region it obtained from its provider, keyed by
//! the region's last byte. Only a view that matches a record exactly (same
//! last byte, same base, full length) can be unmapped or remapped, which rules
//! out double unmaps, partial unmaps and unmapping memory the registry does
//! not own.

use crate::{
    Result,
    errno::Errno,
    error::{Error, invalid_argument},
    mmap::{MapFlags, MapProvider, ProtFlags, RawFd},
    view::{MappedView, RegionKey},
};
use core::ptr::NonNull;
use foldhash::fast::FixedState;
use hashbrown::HashMap;
use spin::Mutex;

/// Hasher seed for the active set. Keys are addresses handed out by the OS,
/// so a fixed seed is enough and keeps the constructor `const`.
const HASH_SEED: u64 = 0x6d6d_6170_7065_72;

/// A region owned by the registry, exactly as the provider returned it.
#[derive(Clone, Copy, Debug)]
struct Region {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: a region is only an address range; it is never dereferenced by the registry.
unsafe impl Send for Region {}

/// Bookkeeping layer over a [`MapProvider`].
///
/// A registry is meant to be constructed once and shared by reference. Several
/// registries may coexist; each only accepts views it produced itself.
///
/// Mappings still active when the registry is dropped are left mapped.
pub struct MappingRegistry<P: MapProvider> {
    provider: P,
    active: Mutex<HashMap<RegionKey, Region, FixedState>>,
}

impl<P: MapProvider> MappingRegistry<P> {
    /// Creates an empty registry over `provider`.
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            active: Mutex::new(HashMap::with_hasher(FixedState::with_seed(HASH_SEED))),
        }
    }

    /// The underlying provider.
    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of active mappings.
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    /// Whether `view` currently covers exactly one active mapping of this registry.
    pub fn contains(&self, view: &MappedView) -> bool {
        let Ok(key) = check_view(view) else {
            return false;
        };
        self.active
            .lock()
            .get(&key)
            .is_some_and(|region| region.base == view.base())
    }

    /// Maps `len` bytes and registers the new region.
    ///
    /// The provider picks the address. The returned view covers exactly `len`
    /// bytes with no spare capacity, and only hands out byte slices for the
    /// accesses `prot` allows.
    ///
    /// # Errors
    /// * [`Error::InvalidArgument`] if `len` is zero. The provider is not called.
    /// * [`Error::Os`] with the provider's code if the mapping fails.
    pub fn map(
        &self,
        fd: RawFd,
        offset: i64,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
    ) -> Result<MappedView> {
        if len == 0 {
            #[cfg(feature = "log")]
            log::debug!("[Map] rejected: zero length");
            return Err(invalid_argument("mapping length must be non-zero"));
        }

        let base = unsafe { self.provider.mmap(0, len, prot, flags, fd, offset) }.map_err(
            |errno| {
                #[cfg(feature = "log")]
                log::debug!("[Map] provider failed: length: {}, error: {}", len, errno);
                Error::Os(errno)
            },
        )?;

        let view = unsafe { MappedView::from_raw_parts(base, len, len, prot) };
        let key = view
            .key()
            .ok_or_else(|| invalid_argument("mapping length must be non-zero"))?;

        let _prev = self.active.lock().insert(key, Region { base, len });
        #[cfg(feature = "log")]
        if let Some(prev) = _prev {
            log::warn!(
                "[Map] provider returned a region overlapping an active mapping at {:p}",
                prev.base
            );
        }
        #[cfg(feature = "log")]
        log::trace!(
            "[Map] address: {:p}, length: {}, prot: {:?}, flags: {:?}, fd: {}, offset: {}",
            base,
            len,
            prot,
            flags,
            fd,
            offset
        );
        Ok(view)
    }

    /// Unmaps the region `view` was returned for and forgets it.
    ///
    /// If the provider fails, the record is kept so the call can be retried.
    ///
    /// # Errors
    /// * [`Error::InvalidArgument`] if the view is empty, is a sub-view, or is
    ///   not an active mapping of this registry (including one already unmapped).
    /// * [`Error::Os`] with the provider's code if unmapping fails.
    ///
    /// # Safety
    /// On success the memory is gone: the caller must not access `view`, or any
    /// view derived from it, afterwards.
    pub unsafe fn unmap(&self, view: &MappedView) -> Result<()> {
        self.release(view, "Munmap", |region| unsafe {
            self.provider.munmap(region.base, region.len)
        })
    }

    /// Remaps the region `view` was returned for as encrypted and forgets it.
    ///
    /// The remapped region is no longer tracked: it cannot be unmapped through
    /// this registry afterwards.
    ///
    /// # Errors
    /// Same as [`MappingRegistry::unmap`].
    ///
    /// # Safety
    /// On success the caller must not access `view`, or any view derived from
    /// it, afterwards.
    pub unsafe fn remap_encrypted(
        &self,
        view: &MappedView,
        cryptid: u32,
        cpu_type: u32,
        cpu_subtype: u32,
    ) -> Result<()> {
        self.release(view, "MremapEncrypted", |region| unsafe {
            self.provider
                .mremap_encrypted(region.base, region.len, cryptid, cpu_type, cpu_subtype)
        })
    }

    /// Validates `view` against the active set and, while still holding the
    /// lock, runs `op` on the matching region. The record is removed only if
    /// `op` succeeds.
    fn release(
        &self,
        view: &MappedView,
        _name: &'static str,
        op: impl FnOnce(&Region) -> core::result::Result<(), Errno>,
    ) -> Result<()> {
        let key = check_view(view).inspect_err(|_err| {
            #[cfg(feature = "log")]
            log::debug!("[{}] rejected {:?}: {}", _name, view, _err);
        })?;

        let mut active = self.active.lock();
        let Some(region) = active
            .get(&key)
            .filter(|region| region.base == view.base())
            .copied()
        else {
            drop(active);
            #[cfg(feature = "log")]
            log::debug!("[{}] rejected {:?}: not an active mapping", _name, view);
            return Err(invalid_argument("view is not an active mapping"));
        };

        let res = op(&region);
        if res.is_ok() {
            active.remove(&key);
        }
        drop(active);

        res.map_err(|errno| {
            #[cfg(feature = "log")]
            log::debug!(
                "[{}] provider failed: address: {:p}, length: {}, error: {}",
                _name,
                region.base,
                region.len,
                errno
            );
            Error::Os(errno)
        })?;

        #[cfg(feature = "log")]
        log::trace!(
            "[{}] address: {:p}, length: {}",
            _name,
            region.base,
            region.len
        );
        Ok(())
    }
}

impl<P: MapProvider + Default> Default for MappingRegistry<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: MapProvider> core::fmt::Debug for MappingRegistry<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("active", &self.len())
            .finish()
    }
}

/// Checks the shape of a caller-supplied view and derives its key.
fn check_view(view: &MappedView) -> Result<RegionKey> {
    if view.is_empty() {
        return Err(invalid_argument("view is empty"));
    }
    if view.len() != view.capacity() {
        return Err(invalid_argument("view does not cover its whole region"));
    }
    view.key().ok_or_else(|| invalid_argument("view is empty"))
}
