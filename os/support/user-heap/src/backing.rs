use kernel_memory_addresses::VirtualAddress;

/// The kernel side of the user heap.
///
/// The heap commits to a range in its block table first and then asks the
/// kernel to back it with frames, or to drop the frames again on free.
/// Requests are assumed to succeed.
pub trait Backing {
    /// Back `[va, va + size)` with memory.
    fn request_backing(&mut self, va: VirtualAddress, size: u64);

    /// Release the memory behind `[va, va + size)`.
    fn release_backing(&mut self, va: VirtualAddress, size: u64);
}
