//! # Frame and Page-Table Adapter
//!
//! The heap allocators never touch page tables or the physical frame pool
//! directly. They go through the two traits defined here:
//!
//! - [`FrameAlloc`] hands out and takes back 4 KiB physical frames and owns
//!   each frame's **reference count**.
//! - [`PageMapper`] installs, removes and looks up single 4 KiB leaf mappings
//!   in the active address space.
//!
//! ```text
//!  KernelHeap ──► Vmm ──┬──► PageMapper  (map_frame / unmap_frame / frame_at)
//!                       └──► FrameAlloc  (allocate_frame / free_frame / refcounts)
//! ```
//!
//! ## Reference counting contract
//!
//! Mapping and unmapping do **not** change reference counts. Whoever maps a
//! frame calls [`FrameAlloc::add_reference`]; whoever unmaps it calls
//! [`FrameAlloc::remove_reference`] and returns the frame with
//! [`FrameAlloc::free_frame`] once the count reaches zero.
//!
//! ## Hosted builds
//!
//! With the `soft` feature, the `soft` module provides an in-memory
//! implementation of both traits with fault injection. The allocator crates
//! enable it from their `[dev-dependencies]` and run their tests against it.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "soft"))]
extern crate alloc;

mod page_flags;
#[cfg(any(test, feature = "soft"))]
pub mod soft;

pub use kernel_memory_addresses as addresses;
pub use page_flags::PageFlags;

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress, VirtualPage};

/// A 4 KiB physical frame, identified by its page-aligned base.
pub type PhysFrame = PhysicalPage<Size4K>;

/// Physical frame pool with per-frame reference counts.
pub trait FrameAlloc {
    /// Take one free frame from the pool. Returns `None` on out-of-memory.
    ///
    /// A freshly allocated frame has a reference count of zero.
    fn allocate_frame(&mut self) -> Option<PhysFrame>;

    /// Return `frame` to the pool.
    fn free_frame(&mut self, frame: PhysFrame);

    /// Increment the reference count of `frame`, returning the new count.
    fn add_reference(&mut self, frame: PhysFrame) -> u32;

    /// Decrement the reference count of `frame` (saturating at zero),
    /// returning the new count.
    fn remove_reference(&mut self, frame: PhysFrame) -> u32;

    /// Current reference count of `frame`.
    fn references(&self, frame: PhysFrame) -> u32;

    /// Physical address of the first byte of `frame`.
    #[inline]
    fn physical_address_of(&self, frame: PhysFrame) -> PhysicalAddress {
        frame.base()
    }
}

/// Single-page view of the active address space's page tables.
pub trait PageMapper {
    /// Install a 4 KiB leaf mapping `page → frame` with `flags`.
    ///
    /// # Errors
    /// See [`FrameMapError`].
    fn map_frame(
        &mut self,
        frame: PhysFrame,
        page: VirtualPage<Size4K>,
        flags: PageFlags,
    ) -> Result<(), FrameMapError>;

    /// Remove the leaf mapping of `page`, if any. Does not touch the frame's
    /// reference count.
    fn unmap_frame(&mut self, page: VirtualPage<Size4K>);

    /// The frame backing `va`, or `None` if the address is unmapped.
    fn frame_at(&self, va: VirtualAddress) -> Option<PhysFrame>;

    #[inline]
    fn is_mapped(&self, page: VirtualPage<Size4K>) -> bool {
        self.frame_at(page.base()).is_some()
    }
}

/// Reasons a [`PageMapper`] can refuse a mapping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameMapError {
    #[error("page {0} is already mapped")]
    AlreadyMapped(VirtualAddress),
    #[error("out of memory for intermediate page tables")]
    OutOfTableMemory,
    #[error("mapping at {0} refused")]
    Refused(VirtualAddress),
}
