//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw addresses and page bases used by the heap
//! allocators and the page-table adapter.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] / [`VirtualPage<S>`] | Page-table translated memory. |
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | Physical memory (frames). |
//! | [`VirtualPageRange<S>`] | Half-open run of virtual pages, iterable. |
//!
//! Both heaps allocate in whole [`Size4K`] pages; the [`PageSize`] trait
//! carries the rounding helpers so callers never hand-roll masks.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xFFFF_C000_0000_1234);
//! assert_eq!(va.align_down::<Size4K>().as_u64(), 0xFFFF_C000_0000_1000);
//! assert_eq!(Size4K::round_up(1), Some(4096));
//! assert_eq!(Size4K::round_up(u64::MAX), None);
//!
//! let base = va.align_down::<Size4K>();
//! let pages: Vec<_> = VirtualPage::<Size4K>::range(base, base + 0x2000).collect();
//! assert_eq!(pages.len(), 2);
//! ```
//!
//! The types are `#[repr(transparent)]` over `u64` and implement `Copy`,
//! `Eq`, `Ord` and `Hash`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod page_size;
mod physical_address;
mod virtual_address;

pub use page_size::{PageSize, Size4K};
pub use physical_address::{PhysicalAddress, PhysicalPage};
pub use virtual_address::{VirtualAddress, VirtualPage, VirtualPageRange};

/// Align `x` down to the nearest multiple of `a` (`a` must be a power of two).
///
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(8191, 4096), 4096);
/// ```
#[inline]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a` (`a` must be a power of two).
///
/// Returns `None` if the result does not fit in a `u64`.
///
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(1, 4096), Some(4096));
/// assert_eq!(align_up(4096, 4096), Some(4096));
/// assert_eq!(align_up(u64::MAX, 4096), None);
/// ```
#[inline]
#[must_use]
pub const fn align_up(x: u64, a: u64) -> Option<u64> {
    match x.checked_add(a - 1) {
        Some(v) => Some(v & !(a - 1)),
        None => None,
    }
}
