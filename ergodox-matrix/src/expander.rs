//! MCP23018 I/O expander client for the left half of the ErgoDox.
//!
//! Port A drives the left-hand rows (and one LED), port B reads the
//! left-hand columns with internal pull-ups. Every transaction records its
//! outcome in a [`DeviceStatus`] that the row driver and scanner consult
//! instead of threading errors through the scan.

use crate::bus::{BusError, DeviceStatus, Transaction, TwoWire};
use crate::config::EXPANDER_ADDR;

// MCP23018 register addresses (IOCON.BANK = 0, default). With BANK = 0 the
// register pointer auto-increments, so A/B pairs can be written in one go.
pub const IODIRA: u8 = 0x00; // I/O direction register
pub const IODIRB: u8 = 0x01;
pub const GPPUA: u8 = 0x0C; // pull-up resistor register
pub const GPPUB: u8 = 0x0D;
pub const GPIOA: u8 = 0x12; // port register (writes modify OLAT)
pub const GPIOB: u8 = 0x13;
pub const OLATA: u8 = 0x14; // output latch register
pub const OLATB: u8 = 0x15;

/// Port A direction: rows and the LED are outputs (0).
const IODIRA_VALUE: u8 = 0b0000_0000;
/// Port B direction: columns B0-B5 are inputs (1), B6-B7 unused outputs.
const IODIRB_VALUE: u8 = 0b0011_1111;
/// Pull-ups on the column inputs only.
const GPPUA_VALUE: u8 = 0b0000_0000;
const GPPUB_VALUE: u8 = 0b0011_1111;

pub struct Mcp23018<B> {
    bus: B,
    status: DeviceStatus,
}

impl<B: TwoWire> Mcp23018<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            status: DeviceStatus::Ok,
        }
    }

    /// Status of the most recent transaction.
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Configure pin directions and pull-ups.
    ///
    /// Stops at the first failed transaction; the failure is left in
    /// [`status`](Self::status).
    pub fn init(&mut self) -> Result<(), BusError> {
        self.write_registers(IODIRA, &[IODIRA_VALUE, IODIRB_VALUE])?;
        self.write_registers(GPPUA, &[GPPUA_VALUE, GPPUB_VALUE])?;
        Ok(())
    }

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.write_registers(register, &[value])
    }

    /// Write consecutive registers starting at `register` in one transaction.
    pub fn write_registers(&mut self, register: u8, values: &[u8]) -> Result<(), BusError> {
        let result = write_sequence(&mut self.bus, register, values);
        self.status = DeviceStatus::from(&result);
        result
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8, BusError> {
        let result = read_single(&mut self.bus, register);
        self.status = DeviceStatus::from(&result);
        result
    }
}

fn write_sequence<B: TwoWire>(bus: &mut B, register: u8, values: &[u8]) -> Result<(), BusError> {
    let mut txn = Transaction::begin(bus, EXPANDER_ADDR)?;
    txn.write(register)?;
    for &value in values {
        txn.write(value)?;
    }
    Ok(())
}

fn read_single<B: TwoWire>(bus: &mut B, register: u8) -> Result<u8, BusError> {
    let mut txn = Transaction::begin(bus, EXPANDER_ADDR)?;
    txn.write(register)?;
    txn.restart_read()?;
    txn.read_nak()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BusOp, FaultAt, SimExpander};

    const WRITE_ADDR: u8 = EXPANDER_ADDR << 1;
    const READ_ADDR: u8 = WRITE_ADDR | 1;

    fn stops(log: &[BusOp]) -> usize {
        log.iter().filter(|&&op| op == BusOp::Stop).count()
    }

    #[test]
    fn init_configures_directions_and_pullups() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.init().unwrap();

        let sim = mcp.bus();
        assert_eq!(sim.register(IODIRA), 0x00);
        assert_eq!(sim.register(IODIRB), 0x3F);
        assert_eq!(sim.register(GPPUA), 0x00);
        assert_eq!(sim.register(GPPUB), 0x3F);
        assert!(mcp.status().is_ok());
    }

    #[test]
    fn read_uses_repeated_start() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().clear_log();
        mcp.read_register(GPIOB).unwrap();

        let addr = EXPANDER_ADDR << 1;
        assert_eq!(
            mcp.bus().log(),
            &[
                BusOp::Start(addr),
                BusOp::Write(GPIOB),
                BusOp::Start(addr | 1),
                BusOp::ReadNak,
                BusOp::Stop,
            ]
        );
    }

    #[test]
    fn failed_start_still_stops_and_records_status() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().set_online(false);
        mcp.bus_mut().clear_log();

        assert_eq!(mcp.write_register(GPIOA, 0xFF), Err(BusError::AddressNack));
        assert_eq!(mcp.status(), DeviceStatus::Failed(BusError::AddressNack));
        assert_eq!(mcp.status().code(), 0x20);
        assert_eq!(
            mcp.bus().log(),
            &[BusOp::Start(EXPANDER_ADDR << 1), BusOp::Stop]
        );
    }

    #[test]
    fn init_stops_at_first_failure() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().set_online(false);
        assert!(mcp.init().is_err());
        assert_eq!(mcp.bus().transactions(), 1);
    }

    #[test]
    fn success_clears_previous_failure() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().set_online(false);
        let _ = mcp.read_register(GPIOB);
        assert!(mcp.status().is_err());

        mcp.bus_mut().set_online(true);
        mcp.read_register(GPIOB).unwrap();
        assert!(mcp.status().is_ok());
    }

    #[test]
    fn nacked_register_pointer_skips_the_value() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().fail_next(FaultAt::Write(0), BusError::DataNack);
        mcp.bus_mut().clear_log();

        assert_eq!(mcp.write_register(GPIOA, 0x7E), Err(BusError::DataNack));
        let log = mcp.bus().log();
        assert_eq!(log, &[BusOp::Start(WRITE_ADDR), BusOp::Write(GPIOA), BusOp::Stop]);
        assert_eq!(stops(log), 1);
        assert_eq!(mcp.status(), DeviceStatus::Failed(BusError::DataNack));
        assert_eq!(mcp.bus().register(GPIOA), 0x00);
    }

    #[test]
    fn nacked_value_stops_the_sequence() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().fail_next(FaultAt::Write(1), BusError::DataNack);
        mcp.bus_mut().clear_log();

        assert!(mcp.write_registers(IODIRA, &[0x00, 0x3F]).is_err());
        assert_eq!(
            mcp.bus().log(),
            &[
                BusOp::Start(WRITE_ADDR),
                BusOp::Write(IODIRA),
                BusOp::Write(0x00),
                BusOp::Stop,
            ]
        );
        assert_eq!(mcp.bus().register(IODIRB), 0xFF);
    }

    #[test]
    fn failed_repeated_start_skips_the_read() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().fail_next(FaultAt::ReadStart, BusError::ArbitrationLost);
        mcp.bus_mut().clear_log();

        assert_eq!(mcp.read_register(GPIOB), Err(BusError::ArbitrationLost));
        let log = mcp.bus().log();
        assert_eq!(
            log,
            &[
                BusOp::Start(WRITE_ADDR),
                BusOp::Write(GPIOB),
                BusOp::Start(READ_ADDR),
                BusOp::Stop,
            ]
        );
        assert_eq!(stops(log), 1);
        assert_eq!(mcp.status(), DeviceStatus::Failed(BusError::ArbitrationLost));
        assert_eq!(mcp.status().code(), 0x38);
    }

    #[test]
    fn failed_final_read_still_stops() {
        let mut mcp = Mcp23018::new(SimExpander::new());
        mcp.bus_mut().fail_next(FaultAt::ReadNak, BusError::Unexpected(0x50));
        mcp.bus_mut().clear_log();

        assert_eq!(mcp.read_register(GPIOB), Err(BusError::Unexpected(0x50)));
        let log = mcp.bus().log();
        assert_eq!(
            log,
            &[
                BusOp::Start(WRITE_ADDR),
                BusOp::Write(GPIOB),
                BusOp::Start(READ_ADDR),
                BusOp::ReadNak,
                BusOp::Stop,
            ]
        );
        assert_eq!(stops(log), 1);
        assert_eq!(mcp.status(), DeviceStatus::Failed(BusError::Unexpected(0x50)));
        assert_eq!(mcp.status().code(), 0x50);

        // The fault fires once; the next read goes through.
        assert!(mcp.read_register(GPIOB).is_ok());
        assert!(mcp.status().is_ok());
    }
}
