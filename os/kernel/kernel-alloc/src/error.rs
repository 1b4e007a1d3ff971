use crate::vmm::VmmError;
use kernel_memory_addresses::VirtualAddress;

/// Failures of [`KernelHeap::allocate`](crate::KernelHeap::allocate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelHeapError {
    /// No unmapped run in the heap range is large enough.
    #[error("no unmapped run can hold {requested} bytes")]
    OutOfSpace { requested: u64 },
    /// Backing a page of the chosen run failed.
    #[error("mapping failed at {at} after {mapped} page(s)")]
    MappingFailure {
        at: VirtualAddress,
        mapped: u64,
        #[source]
        source: VmmError,
    },
}

/// Operations the kernel heap deliberately does not provide.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unsupported {
    #[error("kernel heap cannot reallocate {address}")]
    Reallocate { address: VirtualAddress },
}
