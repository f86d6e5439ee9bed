//! Compile-time configuration of the ErgoDox matrix.
//!
//! The matrix is 14 logical rows by 6 logical columns. Rows `0..REMOTE_ROWS`
//! are the left half, wired to an MCP23018 I/O expander on the I2C bus.
//! The remaining rows are the right half, wired straight to Teensy GPIO.
//!
//! Row pin configuration:
//!
//! ```text
//! MCP23018
//! row: 0   1   2   3   4   5   6
//! pin: A0  A1  A2  A3  A4  A5  A6
//!
//! Teensy
//! row: 7   8   9   10  11  12  13
//! pin: B0  B1  B2  B3  D2  D3  C6
//! ```
//!
//! Column pin configuration:
//!
//! ```text
//! Teensy
//! col: 0   1   2   3   4   5
//! pin: F0  F1  F4  F5  F6  F7
//!
//! MCP23018
//! col: 0   1   2   3   4   5
//! pin: B5  B4  B3  B2  B1  B0
//! ```

/// One row of the matrix, one bit per column (bit set = pressed).
pub type MatrixRow = u8;

/// Number of logical rows.
pub const ROWS: usize = 14;
/// Number of logical columns.
pub const COLS: usize = 6;
/// Rows `0..REMOTE_ROWS` live on the I/O expander.
pub const REMOTE_ROWS: usize = 7;
/// Rows `REMOTE_ROWS..ROWS` live on local GPIO.
pub const LOCAL_ROWS: usize = ROWS - REMOTE_ROWS;

/// Bits of a [`MatrixRow`] that correspond to real columns.
pub const COL_MASK: MatrixRow = ((1u16 << COLS) - 1) as MatrixRow;

/// Number of scans a column must stay quiet after a toggle before the next
/// toggle is accepted. The scan period is usually around 3ms.
pub const DEBOUNCE: usize = 3;

/// 7-bit I2C address of the MCP23018 (ADDR pin grounded).
pub const EXPANDER_ADDR: u8 = 0b010_0000;

const _: () = assert!(DEBOUNCE >= 1, "DEBOUNCE must be larger or equal 1");
const _: () = assert!(COLS <= MatrixRow::BITS as usize);
const _: () = assert!(REMOTE_ROWS <= 7, "expander port A bit 7 is the LED");

/// Microcontroller GPIO ports used by the local half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    B,
    C,
    D,
    F,
}

/// A single microcontroller pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub port: Port,
    pub bit: u8,
}

impl Pin {
    pub const fn new(port: Port, bit: u8) -> Self {
        Self { port, bit }
    }

    pub const fn mask(self) -> u8 {
        1 << self.bit
    }
}

/// Local row drive pins, indexed by `row - REMOTE_ROWS`.
pub const LOCAL_ROW_PINS: [Pin; LOCAL_ROWS] = [
    Pin::new(Port::B, 0),
    Pin::new(Port::B, 1),
    Pin::new(Port::B, 2),
    Pin::new(Port::B, 3),
    Pin::new(Port::D, 2),
    Pin::new(Port::D, 3),
    Pin::new(Port::C, 6),
];

/// Port sampled for local columns.
pub const LOCAL_COLUMN_PORT: Port = Port::F;

/// Physical bit of [`LOCAL_COLUMN_PORT`] for each logical column.
pub const LOCAL_COLUMN_BITS: [u8; COLS] = [0, 1, 4, 5, 6, 7];

/// Physical bit of expander GPIOB for each logical column.
pub const REMOTE_COLUMN_BITS: [u8; COLS] = [5, 4, 3, 2, 1, 0];

/// Expander GPIOA bit driving left LED 3 (active low).
pub const LEFT_LED_3_SHIFT: u8 = 7;

/// Re-pack a raw port value into logical column order.
///
/// Bit `bits[c]` of `port` becomes bit `c` of the result. No inversion is
/// applied; callers deal with the active-low convention.
pub fn pack_columns(port: u8, bits: &[u8; COLS]) -> MatrixRow {
    bits.iter()
        .enumerate()
        .fold(0, |acc, (col, &bit)| acc | (((port >> bit) & 1) << col))
}
