//! Kernel heap behaviour knobs.

/// What the kernel heap does with the pages it already mapped when an
/// allocation fails part-way through.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MappingFailurePolicy {
    /// Keep the pages mapped. They stay allocated but untracked.
    #[default]
    Leak,
    /// Unmap the pages mapped by the failing call and release their frames.
    Rollback,
}

/// Configuration of a [`KernelHeap`](crate::KernelHeap).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct KernelHeapConfig {
    pub on_mapping_failure: MappingFailurePolicy,
}

impl KernelHeapConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_mapping_failure: MappingFailurePolicy::Leak,
        }
    }

    #[must_use]
    pub const fn with_mapping_failure(mut self, policy: MappingFailurePolicy) -> Self {
        self.on_mapping_failure = policy;
        self
    }
}
