//! # User Heap Allocator
//!
//! Block-splitting, next-fit allocator for a process's user heap range.
//! Allocations are whole pages; the memory behind them is requested from the
//! kernel through a [`Backing`] after the block table has been updated.
//!
//! ```rust
//! use kernel_memory_addresses::VirtualAddress;
//! use user_heap::{Backing, UserHeap};
//!
//! struct Nothing;
//! impl Backing for Nothing {
//!     fn request_backing(&mut self, _: VirtualAddress, _: u64) {}
//!     fn release_backing(&mut self, _: VirtualAddress, _: u64) {}
//! }
//!
//! let start = VirtualAddress::new(0x8000_0000);
//! let mut heap = UserHeap::<16, 16>::new(start, start + 16 * 4096);
//!
//! let a = heap.allocate(&mut Nothing, 100).unwrap();
//! let b = heap.allocate(&mut Nothing, 100).unwrap();
//! assert_eq!(b, a + 4096);
//!
//! heap.free(&mut Nothing, a);
//! heap.free(&mut Nothing, b);
//! assert_eq!(heap.blocks().count(), 1);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod backing;
mod block;
mod config;
mod error;
mod heap;

pub use backing::Backing;
pub use block::{BlockTable, HeapBlock};
pub use config::{CoalescePolicy, UserHeapConfig};
pub use error::{Unsupported, UserHeapError};
pub use heap::{UserAllocation, UserHeap};
