//! In-memory ErgoDox board for host-side tests and the simulator.
//!
//! [`SimExpander`] answers the two-wire primitives the way an MCP23018 does
//! (register pointer, auto-increment, repeated-start reads), and
//! [`SimPins`] models the Teensy ports. Switches are set in logical
//! row/column terms and translated through the same wiring tables the
//! driver uses.

use heapless::Vec;

use crate::bus::{BusError, TwoWire, I2C_READ};
use crate::config::{
    MatrixRow, Pin, Port, COLS, DEBOUNCE, EXPANDER_ADDR, LOCAL_COLUMN_BITS, LOCAL_COLUMN_PORT,
    LOCAL_ROWS, LOCAL_ROW_PINS, REMOTE_COLUMN_BITS, REMOTE_ROWS, ROWS,
};
use crate::expander::{GPIOA, GPIOB, IODIRA, IODIRB, OLATA, OLATB};
use crate::rate::Clock;
use crate::scanner::{Indicator, Scanner};

const LOG_CAPACITY: usize = 64;
const REGISTERS: usize = 0x16;

/// One primitive as seen on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Start(u8),
    Write(u8),
    ReadAck,
    ReadNak,
    Stop,
}

/// Primitive at which an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAt {
    /// The n-th write of a transaction; the register pointer is write 0.
    Write(usize),
    /// The repeated start that turns a transaction around for reading.
    ReadStart,
    ReadAck,
    ReadNak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Register,
    Writing,
    Reading,
}

pub struct SimExpander {
    registers: [u8; REGISTERS],
    pointer: u8,
    phase: Phase,
    online: bool,
    keys: [MatrixRow; REMOTE_ROWS],
    log: Vec<BusOp, LOG_CAPACITY>,
    transactions: usize,
    /// Writes seen since the last start in write mode.
    writes: usize,
    fault: Option<(FaultAt, BusError)>,
}

impl SimExpander {
    pub fn new() -> Self {
        let mut registers = [0; REGISTERS];
        // Power-on: every pin is an input.
        registers[IODIRA as usize] = 0xFF;
        registers[IODIRB as usize] = 0xFF;
        Self {
            registers,
            pointer: 0,
            phase: Phase::Idle,
            online: true,
            keys: [0; REMOTE_ROWS],
            log: Vec::new(),
            transactions: 0,
            writes: 0,
            fault: None,
        }
    }

    /// Unplug or replug the left half.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
        if !online {
            // Power loss resets the chip.
            let keys = self.keys;
            *self = Self {
                keys,
                log: core::mem::take(&mut self.log),
                transactions: self.transactions,
                online: false,
                ..Self::new()
            };
        }
    }

    pub fn set_row(&mut self, row: usize, bits: MatrixRow) {
        if let Some(keys) = self.keys.get_mut(row) {
            *keys = bits;
        }
    }

    pub fn set_key(&mut self, row: usize, col: usize, pressed: bool) {
        if let Some(keys) = self.keys.get_mut(row) {
            set_bit(keys, col, pressed);
        }
    }

    /// Current register contents (port registers report the latch).
    pub fn register(&self, register: u8) -> u8 {
        self.load(register)
    }

    /// Most recent primitives, oldest first. Only the first 64 after a
    /// [`clear_log`](Self::clear_log) are kept.
    pub fn log(&self) -> &[BusOp] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Number of completed (stopped) transactions.
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// Fail the next primitive matching `at` with `error`. The fault fires
    /// once; the chip drops off the transaction until the next start.
    pub fn fail_next(&mut self, at: FaultAt, error: BusError) {
        self.fault = Some((at, error));
    }

    fn record(&mut self, op: BusOp) {
        let _ = self.log.push(op);
    }

    fn injected(&mut self, at: FaultAt) -> Result<(), BusError> {
        match self.fault {
            Some((target, error)) if target == at => {
                self.fault = None;
                self.phase = Phase::Idle;
                Err(error)
            }
            _ => Ok(()),
        }
    }

    fn read_next(&mut self) -> Result<u8, BusError> {
        if !self.online || self.phase != Phase::Reading {
            return Err(BusError::Unexpected(0));
        }
        let value = self.load(self.pointer);
        self.pointer = self.pointer.wrapping_add(1);
        Ok(value)
    }

    fn load(&self, register: u8) -> u8 {
        match register {
            GPIOA => self.registers[OLATA as usize],
            GPIOB => self.read_columns(),
            r if (r as usize) < REGISTERS => self.registers[r as usize],
            _ => 0,
        }
    }

    fn store(&mut self, register: u8, value: u8) {
        let target = match register {
            GPIOA => OLATA,
            GPIOB => OLATB,
            r => r,
        };
        if let Some(slot) = self.registers.get_mut(target as usize) {
            *slot = value;
        }
    }

    /// Port B as read by the chip: inputs float high through the pull-ups
    /// unless a pressed switch connects them to a row driven low.
    fn read_columns(&self) -> u8 {
        let iodir_a = self.registers[IODIRA as usize];
        let olat_a = self.registers[OLATA as usize];
        let iodir_b = self.registers[IODIRB as usize];

        let mut inputs = 0xFF;
        for (row, &keys) in self.keys.iter().enumerate() {
            let driven_low = iodir_a & (1 << row) == 0 && olat_a & (1 << row) == 0;
            if !driven_low {
                continue;
            }
            for (col, &bit) in REMOTE_COLUMN_BITS.iter().enumerate() {
                if keys & (1 << col) != 0 {
                    inputs &= !(1 << bit);
                }
            }
        }
        let outputs = self.registers[OLATB as usize];
        (inputs & iodir_b) | (outputs & !iodir_b)
    }
}

impl Default for SimExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl TwoWire for SimExpander {
    fn start(&mut self, address_byte: u8) -> Result<(), BusError> {
        self.record(BusOp::Start(address_byte));
        if !self.online || address_byte >> 1 != EXPANDER_ADDR {
            self.phase = Phase::Idle;
            return Err(BusError::AddressNack);
        }
        if address_byte & I2C_READ != 0 {
            self.injected(FaultAt::ReadStart)?;
            self.phase = Phase::Reading;
        } else {
            self.writes = 0;
            self.phase = Phase::Register;
        }
        Ok(())
    }

    fn write(&mut self, byte: u8) -> Result<(), BusError> {
        self.record(BusOp::Write(byte));
        if !self.online {
            return Err(BusError::DataNack);
        }
        let index = self.writes;
        self.writes += 1;
        self.injected(FaultAt::Write(index))?;
        match self.phase {
            Phase::Register => {
                self.pointer = byte;
                self.phase = Phase::Writing;
                Ok(())
            }
            Phase::Writing => {
                self.store(self.pointer, byte);
                self.pointer = self.pointer.wrapping_add(1);
                Ok(())
            }
            Phase::Idle | Phase::Reading => Err(BusError::DataNack),
        }
    }

    fn read_ack(&mut self) -> Result<u8, BusError> {
        self.record(BusOp::ReadAck);
        self.injected(FaultAt::ReadAck)?;
        self.read_next()
    }

    fn read_nak(&mut self) -> Result<u8, BusError> {
        self.record(BusOp::ReadNak);
        self.injected(FaultAt::ReadNak)?;
        let value = self.read_next();
        self.phase = Phase::Idle;
        value
    }

    fn stop(&mut self) {
        self.record(BusOp::Stop);
        self.phase = Phase::Idle;
        self.transactions += 1;
    }
}

/// Teensy ports. Only the row pins and the column port are modelled.
pub struct SimPins {
    driven: Vec<Pin, LOCAL_ROWS>,
    columns_ready: bool,
    multiple_rows: bool,
    keys: [MatrixRow; LOCAL_ROWS],
}

impl SimPins {
    pub fn new() -> Self {
        Self {
            driven: Vec::new(),
            columns_ready: false,
            multiple_rows: false,
            keys: [0; LOCAL_ROWS],
        }
    }

    /// Set switches of a local row, addressed by its matrix row.
    pub fn set_row(&mut self, row: usize, bits: MatrixRow) {
        if let Some(keys) = local_index(row).map(|i| &mut self.keys[i]) {
            *keys = bits;
        }
    }

    pub fn set_key(&mut self, row: usize, col: usize, pressed: bool) {
        if let Some(keys) = local_index(row).map(|i| &mut self.keys[i]) {
            set_bit(keys, col, pressed);
        }
    }

    /// Row pins currently driven low.
    pub fn driven(&self) -> &[Pin] {
        &self.driven
    }

    /// Whether two rows were ever driven at the same time.
    pub fn saw_multiple_rows(&self) -> bool {
        self.multiple_rows
    }
}

impl Default for SimPins {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::driver::LocalPins for SimPins {
    fn init_columns(&mut self) {
        self.columns_ready = true;
    }

    fn drive_low(&mut self, pin: Pin) {
        if !self.driven.contains(&pin) {
            let _ = self.driven.push(pin);
        }
        if self.driven.len() > 1 {
            self.multiple_rows = true;
        }
    }

    fn release(&mut self, pin: Pin) {
        self.driven.retain(|&p| p != pin);
    }

    fn read_port(&mut self, port: Port) -> u8 {
        if port != LOCAL_COLUMN_PORT || !self.columns_ready {
            return 0xFF;
        }
        let mut value = 0xFF;
        for pin in self.driven.iter() {
            let Some(row) = LOCAL_ROW_PINS.iter().position(|p| p == pin) else {
                continue;
            };
            for (col, &bit) in LOCAL_COLUMN_BITS.iter().enumerate() {
                if self.keys[row] & (1 << col) != 0 {
                    value &= !(1 << bit);
                }
            }
        }
        value
    }
}

/// Board LEDs; counts completed blinks.
#[derive(Debug, Default)]
pub struct SimLeds {
    lit: bool,
    blinks: usize,
}

impl SimLeds {
    pub fn lit(&self) -> bool {
        self.lit
    }

    pub fn blinks(&self) -> usize {
        self.blinks
    }
}

impl Indicator for SimLeds {
    fn all_on(&mut self) {
        self.lit = true;
    }

    fn all_off(&mut self) {
        self.lit = false;
    }

    fn blink_all(&mut self) {
        self.all_on();
        self.all_off();
        self.blinks += 1;
    }
}

/// Settable clock with microsecond resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimClock {
    micros: u64,
}

impl SimClock {
    pub const fn new() -> Self {
        Self { micros: 0 }
    }

    pub fn advance_us(&mut self, micros: u64) {
        self.micros += micros;
    }

    pub fn micros(&self) -> u64 {
        self.micros
    }
}

impl Clock for SimClock {
    fn now_ms(&mut self) -> u32 {
        (self.micros / 1000) as u32
    }
}

/// A scanner wired to the simulated board.
pub type SimScanner<const DEPTH: usize = DEBOUNCE> = Scanner<SimExpander, SimPins, SimLeds, DEPTH>;

impl<const DEPTH: usize> Default for Scanner<SimExpander, SimPins, SimLeds, DEPTH> {
    fn default() -> Self {
        Scanner::new(SimExpander::new(), SimPins::new(), SimLeds::default())
    }
}

impl<const DEPTH: usize> Scanner<SimExpander, SimPins, SimLeds, DEPTH> {
    /// Set the raw switch state of a row on whichever half it lives.
    pub fn set_raw_row(&mut self, row: usize, bits: MatrixRow) {
        if row < REMOTE_ROWS {
            self.driver_mut().expander_mut().bus_mut().set_row(row, bits);
        } else if row < ROWS {
            self.driver_mut().pins_mut().set_row(row, bits);
        }
    }

    pub fn set_key(&mut self, row: usize, col: usize, pressed: bool) {
        if row < REMOTE_ROWS {
            self.driver_mut().expander_mut().bus_mut().set_key(row, col, pressed);
        } else {
            self.driver_mut().pins_mut().set_key(row, col, pressed);
        }
    }

    pub fn set_expander_online(&mut self, online: bool) {
        self.driver_mut().expander_mut().bus_mut().set_online(online);
    }
}

fn local_index(row: usize) -> Option<usize> {
    row.checked_sub(REMOTE_ROWS).filter(|&i| i < LOCAL_ROWS)
}

fn set_bit(bits: &mut MatrixRow, col: usize, on: bool) {
    if col >= COLS {
        return;
    }
    if on {
        *bits |= 1 << col;
    } else {
        *bits &= !(1 << col);
    }
}
