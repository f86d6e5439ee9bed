//! Teensy board LED (PD6) and the three right-hand LEDs (PB5-PB7).

use avr_device::atmega32u4::Peripherals;
use ergodox_matrix::Indicator;

use crate::delay::delay_ms;

const BOARD_LED: u8 = 1 << 6; // PD6
const RIGHT_LEDS: u8 = (1 << 5) | (1 << 6) | (1 << 7); // PB5, PB6, PB7

/// How long a confirmation blink stays lit.
const BLINK_MS: u16 = 333;

pub struct Leds<'a> {
    dp: &'a Peripherals,
}

impl<'a> Leds<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self { dp }
    }

    pub fn set_board(&mut self, on: bool) {
        let portd = &self.dp.PORTD;
        if on {
            portd.ddrd.modify(|r, w| unsafe { w.bits(r.bits() | BOARD_LED) });
            portd.portd.modify(|r, w| unsafe { w.bits(r.bits() | BOARD_LED) });
        } else {
            portd.ddrd.modify(|r, w| unsafe { w.bits(r.bits() & !BOARD_LED) });
            portd.portd.modify(|r, w| unsafe { w.bits(r.bits() & !BOARD_LED) });
        }
    }

    fn set_right(&mut self, on: bool) {
        let portb = &self.dp.PORTB;
        if on {
            portb.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | RIGHT_LEDS) });
            portb.portb.modify(|r, w| unsafe { w.bits(r.bits() | RIGHT_LEDS) });
        } else {
            portb.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !RIGHT_LEDS) });
            portb.portb.modify(|r, w| unsafe { w.bits(r.bits() & !RIGHT_LEDS) });
        }
    }
}

impl Indicator for Leds<'_> {
    fn all_on(&mut self) {
        self.set_board(true);
        self.set_right(true);
    }

    fn all_off(&mut self) {
        self.set_board(false);
        self.set_right(false);
    }

    fn blink_all(&mut self) {
        self.all_on();
        delay_ms(BLINK_MS);
        self.all_off();
    }
}
