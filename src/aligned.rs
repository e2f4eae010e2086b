//! 32-byte-aligned `u16` buffers.
//!
//! The vectorized partition entry points require the value array's base
//! address to be 32-byte aligned; ordinary `Vec<u16>` allocations only
//! guarantee 2 bytes. [`AlignedU16s`] owns an allocation with the required
//! alignment.

use core::alloc::Layout;
use core::slice;
use safe_allocator_api::RawAlloc;

/// Owned `u16` buffer whose base address is 32-byte aligned.
///
/// ```
/// use fuzzy_partition_utils::aligned::AlignedU16s;
///
/// let buf = AlignedU16s::zeroed(100);
/// assert_eq!(buf.as_slice().as_ptr() as usize % 32, 0);
/// assert_eq!(buf.as_slice().len(), 100);
/// ```
pub struct AlignedU16s {
    alloc: RawAlloc,
    len: usize,
}

impl AlignedU16s {
    /// Allocates `len` zeroed values at 32-byte alignment.
    ///
    /// # Panics
    ///
    /// On allocation failure.
    pub fn zeroed(len: usize) -> Self {
        let bytes = (len * 2).max(32);
        let layout = Layout::from_size_align(bytes, 32).expect("invalid buffer layout");
        let alloc = RawAlloc::new_zeroed(layout).expect("aligned allocation failed");
        Self { alloc, len }
    }

    /// Copies `values` into a fresh aligned buffer.
    pub fn from_values(values: &[u16]) -> Self {
        let mut buf = Self::zeroed(values.len());
        buf.as_mut_slice().copy_from_slice(values);
        buf
    }

    pub fn as_slice(&self) -> &[u16] {
        unsafe { slice::from_raw_parts(self.alloc.as_ptr() as *const u16, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        unsafe { slice::from_raw_parts_mut(self.alloc.as_mut_ptr() as *mut u16, self.len) }
    }
}
