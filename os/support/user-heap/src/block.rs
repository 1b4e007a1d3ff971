//! Fixed-capacity block table.
//!
//! Every non-empty slot describes one block of the heap range; together they
//! tile the range without gaps or overlaps. Empty slots are kept in a vacant
//! set ordered so that the lowest free index is always handed out first.

use arrayvec::ArrayVec;
use kernel_memory_addresses::VirtualAddress;

/// One slot of the block table.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HeapBlock {
    pub va: VirtualAddress,
    pub size: u64,
    pub used: bool,
}

impl HeapBlock {
    /// The `{0, 0, false}` slot that describes no memory.
    pub const EMPTY: Self = Self {
        va: VirtualAddress::zero(),
        size: 0,
        used: false,
    };

    #[must_use]
    pub const fn free(va: VirtualAddress, size: u64) -> Self {
        Self {
            va,
            size,
            used: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.size == 0
    }

    /// First address past the block.
    #[inline]
    #[must_use]
    pub const fn end(self) -> VirtualAddress {
        VirtualAddress::new(self.va.as_u64() + self.size)
    }
}

pub struct BlockTable<const N: usize> {
    slots: [HeapBlock; N],
    /// Indices of empty slots, descending, so `pop` yields the lowest.
    vacant: ArrayVec<usize, N>,
}

impl<const N: usize> BlockTable<N> {
    /// A table with every slot empty and no vacant set yet; call
    /// [`reset`](Self::reset) before use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [HeapBlock::EMPTY; N],
            vacant: ArrayVec::new_const(),
        }
    }

    /// Empty every slot, then put `initial` into slot 0.
    pub fn reset(&mut self, initial: HeapBlock) {
        self.slots.fill(HeapBlock::EMPTY);
        self.vacant.clear();
        self.vacant.extend((0..N).rev());
        self.claim(initial);
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[HeapBlock] {
        &self.slots
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<HeapBlock> {
        self.slots.get(index).copied()
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut HeapBlock {
        &mut self.slots[index]
    }

    /// Number of empty slots.
    #[inline]
    #[must_use]
    pub fn vacant(&self) -> usize {
        self.vacant.len()
    }

    /// Store `block` in the lowest empty slot and return its index, or
    /// `None` if every slot is in use.
    pub fn claim(&mut self, block: HeapBlock) -> Option<usize> {
        let index = self.vacant.pop()?;
        self.slots[index] = block;
        Some(index)
    }

    /// Empty slot `index` and make it available to [`claim`](Self::claim).
    pub fn vacate(&mut self, index: usize) {
        if self.slots[index].is_empty() {
            return;
        }
        self.slots[index] = HeapBlock::EMPTY;
        let at = self.vacant.partition_point(|&i| i > index);
        self.vacant.insert(at, index);
    }

    /// Non-empty blocks in slot order.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, HeapBlock)> + '_ {
        self.slots
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
    }
}

impl<const N: usize> Default for BlockTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
