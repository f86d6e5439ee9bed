//! Key matrix acquisition for the ErgoDox.
//!
//! Scans the 14×6 matrix (left half behind an MCP23018 on I2C, right half on
//! Teensy GPIO), debounces it, and exposes the stable key state together
//! with a "changed" flag. A missing or faulty left half only takes its own
//! rows down; the scanner keeps retrying it in the background.
//!
//! Hardware access goes through three small capabilities, [`TwoWire`],
//! [`LocalPins`] and [`Indicator`], so the same code runs on the device and
//! against the simulated board on the host (the `sim` feature).

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod config;
pub mod debounce;
pub mod driver;
pub mod expander;
pub mod matrix;
pub mod rate;
pub mod scanner;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::{BusError, DeviceStatus, TwoWire};
pub use config::{MatrixRow, COLS, DEBOUNCE, ROWS};
pub use debounce::Debouncer;
pub use driver::{LocalPins, RowDriver};
pub use matrix::LogicalMatrix;
pub use rate::{Clock, ScanRate};
pub use scanner::{Indicator, ScanState, Scanner};

/// Number of matrix rows.
pub const fn matrix_rows() -> usize {
    ROWS
}

/// Number of matrix columns.
pub const fn matrix_cols() -> usize {
    COLS
}
