use bitfield_struct::bitfield;

/// Leaf permission bits handed to [`PageMapper::map_frame`](crate::PageMapper::map_frame).
///
/// Same bit positions as an x86-64 PTE so a hardware-backed mapper can OR
/// them straight into the entry.
///
/// | Bit | Field |
/// |-----|-------|
/// | 0   | `present` |
/// | 1   | `writable` |
/// | 2   | `user_access` |
/// | 63  | `no_execute` |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageFlags {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    #[bits(60)]
    __: u64,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl PageFlags {
    /// Present + writable, supervisor only. Used for kernel heap pages.
    #[inline]
    #[must_use]
    pub const fn kernel_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }
}
