//! Busy-wait delays at 16MHz.

/// Busy-wait delay in milliseconds (approximate).
pub fn delay_ms(ms: u16) {
    for _ in 0..ms {
        // ~1ms at 16MHz: 16000 cycles / 4 cycles per loop iteration
        for _ in 0..4000u16 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}

/// Short delay for pin settling (~5us at 16MHz).
#[inline(always)]
pub fn tiny_delay() {
    for _ in 0..20u8 {
        unsafe { core::arch::asm!("nop") };
    }
}
