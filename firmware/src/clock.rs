//! Millisecond clock polled from Timer3.
//!
//! Timer3 free-runs at clk/1024 (64us per tick at 16MHz) with no interrupt.
//! The 16-bit counter wraps every ~4.2s, so `now_ms` must be polled more
//! often than that; the scan loop does so every few milliseconds.

use avr_device::atmega32u4::TC3;
use ergodox_matrix::Clock;

const MICROS_PER_TICK: u32 = 64;
/// CS32:CS30 = 0b101, clk/1024.
const PRESCALE_1024: u8 = 0b101;

pub struct Timer3<'a> {
    tc: &'a TC3,
    last: u16,
    micros: u32,
    millis: u32,
}

impl<'a> Timer3<'a> {
    pub fn new(tc: &'a TC3) -> Self {
        tc.tccr3a.write(|w| unsafe { w.bits(0) });
        tc.tccr3b.write(|w| unsafe { w.bits(PRESCALE_1024) });
        let last = tc.tcnt3.read().bits();
        Self {
            tc,
            last,
            micros: 0,
            millis: 0,
        }
    }
}

impl Clock for Timer3<'_> {
    fn now_ms(&mut self) -> u32 {
        let now = self.tc.tcnt3.read().bits();
        let ticks = now.wrapping_sub(self.last) as u32;
        self.last = now;

        self.micros += ticks * MICROS_PER_TICK;
        self.millis = self.millis.wrapping_add(self.micros / 1000);
        self.micros %= 1000;
        self.millis
    }
}
