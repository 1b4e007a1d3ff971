//! # Kernel synchronization primitives
//!
//! The heaps assume one allocation or free in flight per address space. On a
//! preemptible or multi-core kernel that assumption is enforced by guarding
//! each process-wide heap instance with a [`SpinLock`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
