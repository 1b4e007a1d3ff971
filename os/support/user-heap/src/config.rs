/// How far [`UserHeap::free`](crate::UserHeap::free) merges a freed block
/// with its free neighbours.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CoalescePolicy {
    /// One pass over the block table in slot order. A neighbour that only
    /// becomes adjacent through a merge later in the same pass is not
    /// revisited, so fragmentation can remain.
    #[default]
    SinglePass,
    /// Repeat the pass until nothing merges.
    Converge,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UserHeapConfig {
    pub coalesce: CoalescePolicy,
}

impl UserHeapConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            coalesce: CoalescePolicy::SinglePass,
        }
    }

    #[must_use]
    pub const fn with_coalesce(mut self, policy: CoalescePolicy) -> Self {
        self.coalesce = policy;
        self
    }
}
