//! Row selection and column sampling across both halves.
//!
//! Rows are active low. A selected row is driven low; every other row is
//! left high (expander) or hi-Z (Teensy). Columns have pull-ups, so a pressed
//! switch reads as 0 and is inverted here into the 1 = pressed convention.

use crate::bus::{DeviceStatus, TwoWire};
use crate::config::{
    pack_columns, MatrixRow, Pin, Port, COL_MASK, LEFT_LED_3_SHIFT, LOCAL_COLUMN_BITS,
    LOCAL_COLUMN_PORT, LOCAL_ROW_PINS, REMOTE_COLUMN_BITS, REMOTE_ROWS, ROWS,
};
use crate::expander::{Mcp23018, GPIOA, GPIOB};

/// Raw GPIO access for the Teensy half.
pub trait LocalPins {
    /// Configure the column port as inputs with pull-ups.
    fn init_columns(&mut self);
    /// Drive `pin` as an output at logic low.
    fn drive_low(&mut self, pin: Pin);
    /// Return `pin` to hi-Z (input, no pull-up).
    fn release(&mut self, pin: Pin);
    /// Sample all input bits of `port`.
    fn read_port(&mut self, port: Port) -> u8;
    /// Wait for lines to settle after a row is selected.
    fn settle(&mut self) {}
}

pub struct RowDriver<B, P> {
    expander: Mcp23018<B>,
    pins: P,
    left_led_3: bool,
}

impl<B: TwoWire, P: LocalPins> RowDriver<B, P> {
    pub fn new(bus: B, pins: P) -> Self {
        Self {
            expander: Mcp23018::new(bus),
            pins,
            left_led_3: false,
        }
    }

    pub fn status(&self) -> DeviceStatus {
        self.expander.status()
    }

    pub fn expander(&self) -> &Mcp23018<B> {
        &self.expander
    }

    pub fn expander_mut(&mut self) -> &mut Mcp23018<B> {
        &mut self.expander
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    /// Set the state of left LED 3, which shares the expander's row
    /// register. It takes effect with the next row select or unselect.
    pub fn set_left_led(&mut self, on: bool) {
        self.left_led_3 = on;
    }

    pub fn left_led(&self) -> bool {
        self.left_led_3
    }

    /// Set up both halves and leave every row unselected.
    ///
    /// Returns the expander status after bring-up.
    pub fn init(&mut self) -> DeviceStatus {
        self.init_expander();
        self.pins.init_columns();
        self.unselect_rows();
        self.status()
    }

    /// Configure the expander. On success all of its rows end up inactive.
    pub fn init_expander(&mut self) -> DeviceStatus {
        if self.expander.init().is_ok() {
            self.unselect_remote();
        }
        self.status()
    }

    pub fn select_row(&mut self, row: usize) {
        if row < REMOTE_ROWS {
            // set active row low  : 0
            // set other rows hi-Z : 1
            let value = self.row_register(!(1u8 << row));
            self.write_rows(value);
        } else if let Some(&pin) = LOCAL_ROW_PINS.get(row - REMOTE_ROWS) {
            self.pins.drive_low(pin);
        }
    }

    pub fn unselect_rows(&mut self) {
        self.unselect_remote();
        for &pin in LOCAL_ROW_PINS.iter() {
            self.pins.release(pin);
        }
    }

    /// Read the selected row's columns, 1 = pressed.
    ///
    /// Expander rows read as released while the expander is in error.
    pub fn read_columns(&mut self, row: usize) -> MatrixRow {
        if row >= ROWS {
            return 0;
        }
        if row < REMOTE_ROWS {
            if self.status().is_err() {
                return 0;
            }
            match self.expander.read_register(GPIOB) {
                Ok(port) => !pack_columns(port, &REMOTE_COLUMN_BITS) & COL_MASK,
                Err(_) => 0,
            }
        } else {
            self.pins.settle();
            let port = self.pins.read_port(LOCAL_COLUMN_PORT);
            !pack_columns(port, &LOCAL_COLUMN_BITS) & COL_MASK
        }
    }

    fn unselect_remote(&mut self) {
        let value = self.row_register(0xFF);
        self.write_rows(value);
    }

    /// Combine a row pattern with the LED bit sharing the register.
    fn row_register(&self, rows: u8) -> u8 {
        rows & !((self.left_led_3 as u8) << LEFT_LED_3_SHIFT)
    }

    fn write_rows(&mut self, value: u8) {
        if self.status().is_err() {
            return;
        }
        // Failure is recorded in the expander status.
        let _ = self.expander.write_register(GPIOA, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimExpander, SimPins};

    fn driver() -> RowDriver<SimExpander, SimPins> {
        let mut driver = RowDriver::new(SimExpander::new(), SimPins::new());
        assert!(driver.init().is_ok());
        driver
    }

    #[test]
    fn select_remote_row_drives_only_that_bit() {
        let mut d = driver();
        d.select_row(3);
        assert_eq!(d.expander().bus().register(GPIOA), 0b1111_0111);
        d.unselect_rows();
        assert_eq!(d.expander().bus().register(GPIOA), 0xFF);
    }

    #[test]
    fn led_bit_survives_row_writes() {
        let mut d = driver();
        d.set_left_led(true);
        d.select_row(0);
        assert_eq!(d.expander().bus().register(GPIOA), 0b0111_1110);
        d.unselect_rows();
        assert_eq!(d.expander().bus().register(GPIOA), 0b0111_1111);
    }

    #[test]
    fn select_local_row_drives_its_pin() {
        let mut d = driver();
        d.select_row(11);
        assert_eq!(d.pins().driven(), &[LOCAL_ROW_PINS[4]]);
        d.unselect_rows();
        assert!(d.pins().driven().is_empty());
    }

    #[test]
    fn reads_both_halves_in_logical_order() {
        let mut d = driver();
        d.expander_mut().bus_mut().set_row(2, 0b10_0001);
        d.pins_mut().set_row(9, 0b01_0010);

        d.select_row(2);
        assert_eq!(d.read_columns(2), 0b10_0001);
        d.unselect_rows();

        d.select_row(9);
        assert_eq!(d.read_columns(9), 0b01_0010);
        d.unselect_rows();

        d.select_row(8);
        assert_eq!(d.read_columns(8), 0);
        d.unselect_rows();
    }

    #[test]
    fn expander_error_reads_released_without_traffic() {
        let mut d = driver();
        d.expander_mut().bus_mut().set_row(1, 0b11_1111);
        d.expander_mut().bus_mut().set_online(false);

        d.select_row(1);
        assert!(d.status().is_err());

        let before = d.expander().bus().transactions();
        assert_eq!(d.read_columns(1), 0);
        d.unselect_rows();
        assert_eq!(d.expander().bus().transactions(), before);
    }
}
