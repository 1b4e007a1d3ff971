//! # Kernel Heap Allocation
//!
//! Page-granular heap for the kernel's own address space, plus the helpers
//! that translate between heap addresses and the physical frames behind them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        Static heap (kernel_allocate / kernel_free)  │
//! │    • one KernelHeap behind a SpinLock               │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                   KernelHeap                        │
//! │    • worst-fit over unmapped page runs              │
//! │    • fixed-capacity allocation table                │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                      Vmm                            │
//! │    • PageMapper + FrameAlloc for one operation      │
//! │    • map fresh page / release page / query          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Using a heap instance
//!
//! ```rust
//! use kernel_alloc::{KernelHeap, vmm::Vmm};
//! use kernel_vmem::addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_vmem::soft::{SoftFramePool, SoftPageTable};
//!
//! let mut table = SoftPageTable::new();
//! let mut frames = SoftFramePool::new(PhysicalAddress::new(0x10_0000), 16);
//! let mut vmm = Vmm::new(&mut table, &mut frames);
//!
//! let start = VirtualAddress::new(0xffff_c000_0000_0000);
//! let mut heap = KernelHeap::<8>::new(start, start + 16 * 4096);
//!
//! let a = heap.allocate(&mut vmm, 5000).unwrap();
//! assert_eq!(heap.allocations()[0].size, 8192);
//!
//! let pa = kernel_alloc::translate::physical_for_virtual(&vmm, a).unwrap();
//! assert_eq!(heap.virtual_for_physical(&vmm, pa), Some(a));
//!
//! heap.free(&mut vmm, a);
//! assert!(heap.allocations().is_empty());
//! ```
//!
//! Instances are independent of each other; the [static heap](static_heap)
//! is the one the rest of the kernel uses.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod config;
mod error;
mod kheap;
pub mod static_heap;
pub mod translate;
pub mod vmm;

pub use config::{KernelHeapConfig, MappingFailurePolicy};
pub use error::{KernelHeapError, Unsupported};
pub use kheap::{FreeRuns, KernelAllocation, KernelHeap, PageRun};
pub use static_heap::{
    install_adapter, kernel_allocate, kernel_free, kernel_reallocate, physical_for_virtual,
    virtual_for_physical,
};
