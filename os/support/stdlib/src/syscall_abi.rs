/// System call numbers, passed in `rax`.
///
/// Arguments follow in `rdi`, `rsi`, ...
#[repr(u64)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sysno {
    /// Back the user range `[rdi, rdi + rsi)` with fresh frames.
    AllocateMem = 1,
    /// Unmap the user range `[rdi, rdi + rsi)` and release its frames.
    FreeMem = 2,
}

impl TryFrom<u64> for Sysno {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::AllocateMem),
            2 => Ok(Self::FreeMem),
            other => Err(other),
        }
    }
}
