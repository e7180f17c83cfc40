use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::slice;

use crate::{BlkBenchError, Result};

/// Smallest power of two greater than or equal to `x` (1 for 0). Fails if
/// the result would not fit in a `usize`.
pub fn round_up_to_power_of_two(x: usize) -> Result<usize> {
    x.checked_next_power_of_two().ok_or_else(|| {
        BlkBenchError::ResourceError(format!(
            "{} doesn't fit in the largest power of 2 a usize can hold",
            x
        ))
    })
}

/// Smallest multiple of `alignment` that is greater than or equal to `n`,
/// or `None` if that multiple does not fit in a `u64`.
///
/// `alignment` must be nonzero.
pub fn align_ceil(n: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment != 0, "alignment must be nonzero");
    match n % alignment {
        0 => Some(n),
        remainder => (n - remainder).checked_add(alignment),
    }
}

/// Largest multiple of `alignment` that is less than or equal to `n`.
///
/// `alignment` must be nonzero.
pub fn align_floor(n: u64, alignment: u64) -> u64 {
    debug_assert!(alignment != 0, "alignment must be nonzero");
    n - n % alignment
}

/// Heap buffer whose start address is aligned for unbuffered I/O.
///
/// Memory is zero-initialised on allocation and released on drop, so every
/// exit path out of a read loop frees it.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate `size` bytes aligned to the smallest power of two that holds
    /// `alignment`
    pub fn allocate(alignment: usize, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(BlkBenchError::ResourceError(
                "Cannot allocate an empty I/O buffer".to_string(),
            ));
        }

        let align = round_up_to_power_of_two(alignment)?;
        let layout = Layout::from_size_align(size, align).map_err(|e| {
            BlkBenchError::ResourceError(format!(
                "Invalid buffer layout ({} bytes aligned to {}): {}",
                size, align, e
            ))
        })?;

        // SAFETY: layout has a nonzero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            BlkBenchError::ResourceError(format!(
                "Failed to allocate {} bytes aligned to {}",
                size, align
            ))
        })?;

        Ok(Self { ptr, layout })
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() initialised bytes for the
        // lifetime of self.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len())
            .field("alignment", &self.alignment())
            .finish()
    }
}
