use kernel_memory_addresses::VirtualAddress;

/// Failures of [`UserHeap::allocate`](crate::UserHeap::allocate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserHeapError {
    #[error("zero-sized allocation")]
    ZeroSize,
    /// No free block can hold the request.
    #[error("no free block can hold {requested} bytes")]
    OutOfSpace { requested: u64 },
    /// A block had to be split but every slot of the block table is in use.
    #[error("block table has no empty slot to split {at}")]
    TableExhausted { at: VirtualAddress },
}

/// Operations the user heap deliberately does not provide.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unsupported {
    #[error("user heap cannot reallocate {0}")]
    Reallocate(VirtualAddress),
    #[error("shared memory allocation is not supported")]
    SharedAllocate,
    #[error("shared memory lookup is not supported")]
    SharedGet,
    #[error("shared memory release of {0} is not supported")]
    SharedFree(VirtualAddress),
}
