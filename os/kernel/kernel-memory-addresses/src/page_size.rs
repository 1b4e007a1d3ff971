use core::fmt;
use core::hash::Hash;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;
    /// Short human-readable name, e.g. `"4K"`.
    const NAME: &'static str;

    /// Round `bytes` up to a whole number of pages.
    ///
    /// Returns `None` when the rounded value would not fit in a `u64`.
    #[inline]
    #[must_use]
    fn round_up(bytes: u64) -> Option<u64> {
        crate::align_up(bytes, Self::SIZE)
    }

    /// Round `bytes` down to a page boundary.
    #[inline]
    #[must_use]
    fn round_down(bytes: u64) -> u64 {
        crate::align_down(bytes, Self::SIZE)
    }

    /// Number of whole pages in `bytes` (any partial page is dropped).
    #[inline]
    #[must_use]
    fn pages_in(bytes: u64) -> u64 {
        bytes >> Self::SHIFT
    }
}

/// 4 KiB page (4096 bytes), the granularity of both heaps.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;
    const NAME: &'static str = "4K";
}

impl fmt::Debug for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(Self::NAME)
    }
}
