//! Teensy GPIO for the right half of the matrix.
//!
//! Rows are selected by driving them low (DDR:1, PORT:0) and unselected by
//! returning them to hi-Z (DDR:0, PORT:0). Columns are inputs with pull-ups
//! (DDR:0, PORT:1).

use avr_device::atmega32u4::Peripherals;
use ergodox_matrix::config::{Pin, Port, LOCAL_COLUMN_BITS, LOCAL_COLUMN_PORT};
use ergodox_matrix::LocalPins;

pub struct Pins<'a> {
    dp: &'a Peripherals,
}

impl<'a> Pins<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self { dp }
    }

    /// Apply `ddr` and `out` to the direction and output registers of `port`.
    fn update(&self, port: Port, ddr: impl Fn(u8) -> u8, out: impl Fn(u8) -> u8) {
        let dp = self.dp;
        match port {
            Port::B => {
                dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(ddr(r.bits())) });
                dp.PORTB.portb.modify(|r, w| unsafe { w.bits(out(r.bits())) });
            }
            Port::C => {
                dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(ddr(r.bits())) });
                dp.PORTC.portc.modify(|r, w| unsafe { w.bits(out(r.bits())) });
            }
            Port::D => {
                dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(ddr(r.bits())) });
                dp.PORTD.portd.modify(|r, w| unsafe { w.bits(out(r.bits())) });
            }
            Port::F => {
                dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(ddr(r.bits())) });
                dp.PORTF.portf.modify(|r, w| unsafe { w.bits(out(r.bits())) });
            }
        }
    }
}

impl LocalPins for Pins<'_> {
    fn init_columns(&mut self) {
        let mask = LOCAL_COLUMN_BITS.iter().fold(0u8, |m, &bit| m | (1 << bit));
        self.update(LOCAL_COLUMN_PORT, |ddr| ddr & !mask, |port| port | mask);
    }

    fn drive_low(&mut self, pin: Pin) {
        let mask = pin.mask();
        self.update(pin.port, |ddr| ddr | mask, |port| port & !mask);
    }

    fn release(&mut self, pin: Pin) {
        let mask = pin.mask();
        self.update(pin.port, |ddr| ddr & !mask, |port| port & !mask);
    }

    fn read_port(&mut self, port: Port) -> u8 {
        match port {
            Port::B => self.dp.PORTB.pinb.read().bits(),
            Port::C => self.dp.PORTC.pinc.read().bits(),
            Port::D => self.dp.PORTD.pind.read().bits(),
            Port::F => self.dp.PORTF.pinf.read().bits(),
        }
    }

    fn settle(&mut self) {
        crate::delay::tiny_delay();
    }
}
