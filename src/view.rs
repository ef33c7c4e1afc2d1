//! Bounded byte views over mapped memory.

use crate::mmap::ProtFlags;
use core::{
    fmt::Debug,
    ops::{Bound, RangeBounds},
    ptr::NonNull,
};

/// Lookup key of a mapping: the address of its last byte.
///
/// Two live mappings never overlap, so no two of them share a last byte.
/// Unlike the base address, this cannot collide with a zero-length neighbour.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey(usize);

impl RegionKey {
    /// The address of the last byte.
    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }
}

impl Debug for RegionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RegionKey(0x{:x})", self.0)
    }
}

/// A byte view handed out by a [`MappingRegistry`](crate::MappingRegistry).
///
/// Besides its length, a view carries a capacity: how many bytes exist from
/// its start to the end of the region it was cut from. Views produced by
/// `map` always have `capacity == len`. Views derived with
/// [`MappedView::slice`] keep the capacity semantics of byte slices, which is
/// what lets the registry tell a whole mapping apart from a piece of one.
///
/// A view also remembers the protection it was mapped with. Byte slices are
/// only handed out when that protection allows the access; otherwise the
/// memory is reachable through raw pointers alone.
pub struct MappedView {
    ptr: NonNull<u8>,
    len: usize,
    cap: usize,
    prot: ProtFlags,
}

// SAFETY: a view is a plain pointer to process memory. Unmapping it is unsafe
// and the caller promises not to use the view afterwards.
unsafe impl Send for MappedView {}
unsafe impl Sync for MappedView {}

impl MappedView {
    /// A view of nothing. It is never accepted by `unmap` or `remap_encrypted`.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
            prot: ProtFlags::PROT_NONE,
        }
    }

    /// Builds a view from raw parts.
    ///
    /// # Safety
    /// For as long as the view is used, `ptr` must be valid for `cap` bytes of
    /// every access `prot` permits. `len` must not exceed `cap`.
    #[inline]
    pub const unsafe fn from_raw_parts(
        ptr: NonNull<u8>,
        len: usize,
        cap: usize,
        prot: ProtFlags,
    ) -> Self {
        debug_assert!(len <= cap);
        Self { ptr, len, cap, prot }
    }

    /// Number of bytes visible through this view.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the view is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes from the start of the view to the end of its region.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// The first byte of the view.
    #[inline]
    pub const fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The protection the memory was mapped with.
    #[inline]
    pub const fn prot(&self) -> ProtFlags {
        self.prot
    }

    #[inline]
    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// The key of the region this view ends in, i.e. the address of byte `cap - 1`.
    ///
    /// Returns `None` for a view with no capacity.
    #[inline]
    pub fn key(&self) -> Option<RegionKey> {
        if self.cap == 0 {
            return None;
        }
        Some(RegionKey(self.ptr.as_ptr() as usize + (self.cap - 1)))
    }

    /// The viewed bytes, if the mapping is readable.
    ///
    /// An empty view always yields an empty slice.
    #[inline]
    pub fn as_slice(&self) -> Option<&[u8]> {
        if self.len != 0 && !self.prot.contains(ProtFlags::PROT_READ) {
            return None;
        }
        Some(unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) })
    }

    /// The viewed bytes, if the mapping is both readable and writable.
    ///
    /// An empty view always yields an empty slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if self.len != 0
            && !self
                .prot
                .contains(ProtFlags::PROT_READ | ProtFlags::PROT_WRITE)
        {
            return None;
        }
        Some(unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }

    /// Derives a sub-view, following byte-slice rules: the result starts at
    /// `range.start`, is `end - start` bytes long and keeps the capacity up to
    /// the end of the region.
    ///
    /// # Panics
    /// Panics if the range is out of bounds of this view's length.
    ///
    /// # Safety
    /// The result aliases `self`; the caller must not create overlapping
    /// mutable access through the two views.
    pub unsafe fn slice(&self, range: impl RangeBounds<usize>) -> MappedView {
        let start = match range.start_bound() {
            Bound::Included(&s) => Some(s),
            Bound::Excluded(&s) => s.checked_add(1),
            Bound::Unbounded => Some(0),
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.checked_add(1),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => Some(self.len),
        };
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) if start <= end && end <= self.len => (start, end),
            _ => panic!(
                "range {:?}..{:?} out of bounds for view of length {}",
                range.start_bound(),
                range.end_bound(),
                self.len
            ),
        };
        MappedView {
            ptr: unsafe { self.ptr.add(start) },
            len: end - start,
            cap: self.cap - start,
            prot: self.prot,
        }
    }
}

impl Default for MappedView {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl Debug for MappedView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MappedView")
            .field("base", &self.ptr)
            .field("len", &self.len)
            .field("capacity", &self.cap)
            .field("prot", &self.prot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const RW: ProtFlags = ProtFlags::PROT_READ.union(ProtFlags::PROT_WRITE);

    #[test]
    fn key_is_last_byte() {
        let mut buf = vec![0u8; 16];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        let view = unsafe { MappedView::from_raw_parts(ptr, 16, 16, RW) };
        assert_eq!(view.key().unwrap().addr(), buf.as_ptr() as usize + 15);
    }

    #[test]
    fn slicing_keeps_capacity() {
        let mut buf = vec![0u8; 16];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        let view = unsafe { MappedView::from_raw_parts(ptr, 16, 16, RW) };

        let head = unsafe { view.slice(..15) };
        assert_eq!((head.len(), head.capacity()), (15, 16));
        assert_eq!(head.key(), view.key());

        let tail = unsafe { view.slice(1..) };
        assert_eq!((tail.len(), tail.capacity()), (15, 15));
        assert_eq!(tail.key(), view.key());
        assert_ne!(tail.base(), view.base());
        assert_eq!(tail.prot(), RW);
    }

    #[test]
    fn empty_view_has_no_key() {
        let view = MappedView::default();
        assert!(view.is_empty());
        assert_eq!(view.key(), None);
        assert_eq!(view.as_slice(), Some(&[] as &[u8]));
    }

    #[test]
    fn slices_follow_protection() {
        let mut buf = vec![7u8; 8];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();

        let mut rw = unsafe { MappedView::from_raw_parts(ptr, 8, 8, RW) };
        rw.as_mut_slice().unwrap()[0] = 1;
        assert_eq!(rw.as_slice().unwrap()[0], 1);

        let mut ro = unsafe { MappedView::from_raw_parts(ptr, 8, 8, ProtFlags::PROT_READ) };
        assert_eq!(ro.as_slice().unwrap()[0], 1);
        assert!(ro.as_mut_slice().is_none());

        let mut wo = unsafe { MappedView::from_raw_parts(ptr, 8, 8, ProtFlags::PROT_WRITE) };
        assert!(wo.as_slice().is_none());
        assert!(wo.as_mut_slice().is_none());

        let mut none = unsafe { MappedView::from_raw_parts(ptr, 8, 8, ProtFlags::PROT_NONE) };
        assert!(none.as_slice().is_none());
        assert!(none.as_mut_slice().is_none());
    }

    #[test]
    #[should_panic]
    fn slice_out_of_bounds() {
        let mut buf = vec![0u8; 4];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        let view = unsafe { MappedView::from_raw_parts(ptr, 4, 4, RW) };
        let _ = unsafe { view.slice(2..5) };
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn slice_excluded_start_at_max() {
        let mut buf = vec![0u8; 4];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        let view = unsafe { MappedView::from_raw_parts(ptr, 4, 4, RW) };
        let _ = unsafe { view.slice((Bound::Excluded(usize::MAX), Bound::Unbounded)) };
    }
}
