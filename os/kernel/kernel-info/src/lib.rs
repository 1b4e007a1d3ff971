//! # Kernel Memory Layout
//!
//! Compile-time constants describing where the two heaps live and how large
//! their bookkeeping tables are. Every allocator crate in the workspace reads
//! its defaults from here, so the layout has exactly one source of truth.
//!
//! ```text
//! Virtual Address Space Layout (64-bit):
//!
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │         User Space              │
//! USER_HEAP_START       ├─────────────────────────────────┤ 0x0000_0000_8000_0000
//!                       │   User Heap (per process)       │
//! USER_HEAP_MAX         ├─────────────────────────────────┤ 0x0000_0000_a000_0000
//!                       │         User Space              │
//! LAST_USERSPACE_ADDRESS├─────────────────────────────────┤
//!                       │        Guard Region             │
//! HHDM_BASE             ├─────────────────────────────────┤ 0xffff_8880_0000_0000
//!                       │   Higher Half Direct Mapping    │
//! KERNEL_HEAP_START     ├─────────────────────────────────┤ 0xffff_c000_0000_0000
//!                       │   Kernel Heap (page granular)   │
//! KERNEL_HEAP_MAX       ├─────────────────────────────────┤ 0xffff_c000_0400_0000
//!                       │                                 │
//! KERNEL_BASE           ├─────────────────────────────────┤ 0xffff_ffff_8000_0000
//!                       │       Kernel Text & Data        │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! The heap bounds are not runtime-configurable. Allocator instances accept
//! explicit bounds only so that tests can build small, independent heaps.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
