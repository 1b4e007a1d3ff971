use crate::syscall_abi::Sysno;

/// Ask the kernel to back `[va, va + size)` with memory.
#[inline]
pub fn sys_allocate_mem(va: u64, size: u64) {
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rax") Sysno::AllocateMem as u64 => _,
            in("rdi") va,
            in("rsi") size,
            lateout("rcx") _, // clobbered by SYSCALL
            lateout("r11") _, // clobbered by SYSCALL
            options(nostack)
        );
    }
}

/// Ask the kernel to unmap `[va, va + size)`.
#[inline]
pub fn sys_free_mem(va: u64, size: u64) {
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rax") Sysno::FreeMem as u64 => _,
            in("rdi") va,
            in("rsi") size,
            lateout("rcx") _,
            lateout("r11") _,
            options(nostack)
        );
    }
}
