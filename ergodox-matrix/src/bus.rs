//! Two-wire (I2C) bus primitives.
//!
//! The controller side of the bus is a capability: the firmware implements it
//! on the ATmega32U4 TWI peripheral, and the host simulator implements it
//! with a register-level model of the expander.

use thiserror::Error;

/// Direction bit appended to the 7-bit device address.
pub const I2C_WRITE: u8 = 0;
pub const I2C_READ: u8 = 1;

/// Failure of a single bus primitive.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("bus arbitration lost")]
    ArbitrationLost,
    #[error("device did not acknowledge its address")]
    AddressNack,
    #[error("device did not acknowledge a data byte")]
    DataNack,
    #[error("bus busy")]
    Busy,
    #[error("unexpected bus controller status {0:#04x}")]
    Unexpected(u8),
}

impl BusError {
    /// Non-zero status code, matching the TWI status register values.
    pub fn code(self) -> u8 {
        match self {
            BusError::ArbitrationLost => 0x38,
            BusError::AddressNack => 0x20,
            BusError::DataNack => 0x30,
            BusError::Busy => 0xF8,
            BusError::Unexpected(0) => 0xFF,
            BusError::Unexpected(code) => code,
        }
    }
}

/// Outcome of the most recent transaction with the expander.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceStatus {
    #[default]
    Ok,
    Failed(BusError),
}

impl DeviceStatus {
    pub fn is_ok(self) -> bool {
        self == DeviceStatus::Ok
    }

    pub fn is_err(self) -> bool {
        !self.is_ok()
    }

    /// `0` on success, the failing primitive's code otherwise.
    pub fn code(self) -> u8 {
        match self {
            DeviceStatus::Ok => 0,
            DeviceStatus::Failed(err) => err.code(),
        }
    }
}

impl<T> From<&Result<T, BusError>> for DeviceStatus {
    fn from(result: &Result<T, BusError>) -> Self {
        match result {
            Ok(_) => DeviceStatus::Ok,
            Err(err) => DeviceStatus::Failed(*err),
        }
    }
}

/// Controller-side bus primitives.
///
/// `start` sends a (repeated) start condition followed by `address_byte`
/// (`address << 1 | direction`).
pub trait TwoWire {
    fn start(&mut self, address_byte: u8) -> Result<(), BusError>;
    fn write(&mut self, byte: u8) -> Result<(), BusError>;
    /// Read a byte and acknowledge it (more bytes follow).
    fn read_ack(&mut self) -> Result<u8, BusError>;
    /// Read the final byte of a transfer.
    fn read_nak(&mut self) -> Result<u8, BusError>;
    /// Send a stop condition, releasing the bus. Never fails.
    fn stop(&mut self);
}

/// An open bus transaction. Dropping it sends the stop condition, so the bus
/// is released on every exit path including early `?` returns.
pub struct Transaction<'a, B: TwoWire> {
    bus: &'a mut B,
    address: u8,
}

impl<'a, B: TwoWire> Transaction<'a, B> {
    /// Address `address` (7-bit) for writing.
    pub fn begin(bus: &'a mut B, address: u8) -> Result<Self, BusError> {
        let mut txn = Transaction { bus, address };
        txn.bus.start((address << 1) | I2C_WRITE)?;
        Ok(txn)
    }

    pub fn write(&mut self, byte: u8) -> Result<(), BusError> {
        self.bus.write(byte)
    }

    /// Repeated start, switching the transfer to reading.
    pub fn restart_read(&mut self) -> Result<(), BusError> {
        self.bus.start((self.address << 1) | I2C_READ)
    }

    pub fn read_ack(&mut self) -> Result<u8, BusError> {
        self.bus.read_ack()
    }

    pub fn read_nak(&mut self) -> Result<u8, BusError> {
        self.bus.read_nak()
    }
}

impl<B: TwoWire> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        self.bus.stop();
    }
}
