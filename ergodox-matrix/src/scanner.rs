//! Matrix scan loop with expander fault recovery.

use log::{debug, info, warn};

use crate::bus::{DeviceStatus, TwoWire};
use crate::config::{MatrixRow, COLS, DEBOUNCE, ROWS};
use crate::debounce::Debouncer;
use crate::driver::{LocalPins, RowDriver};
use crate::matrix::LogicalMatrix;
use crate::rate::{Clock, ScanRate};

/// Board LEDs used for user-visible diagnostics.
pub trait Indicator {
    fn all_on(&mut self);
    fn all_off(&mut self);
    /// Flash every LED once.
    fn blink_all(&mut self);
}

/// Health of the expander half as seen by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Healthy,
    DeviceError,
}

pub struct Scanner<B, P, L, const DEPTH: usize = DEBOUNCE> {
    driver: RowDriver<B, P>,
    debouncer: Debouncer<DEPTH>,
    leds: L,
    /// Counts scans while the expander is in error. Wraps every 256 scans,
    /// and a reset is attempted on each wrap.
    reset_loop: u8,
    changed: bool,
    /// Completed scans since [`initialize`](Self::initialize); wraps.
    scans: u32,
    rate: ScanRate,
}

impl<B, P, L, const DEPTH: usize> Scanner<B, P, L, DEPTH>
where
    B: TwoWire,
    P: LocalPins,
    L: Indicator,
{
    pub fn new(bus: B, pins: P, leds: L) -> Self {
        Self {
            driver: RowDriver::new(bus, pins),
            debouncer: Debouncer::new(),
            leds,
            reset_loop: 0,
            changed: false,
            scans: 0,
            rate: ScanRate::new(),
        }
    }

    pub fn rows(&self) -> usize {
        ROWS
    }

    pub fn cols(&self) -> usize {
        COLS
    }

    /// Bring up both halves and clear all key state.
    pub fn initialize(&mut self) {
        let status = self.driver.init();
        if status.is_ok() {
            info!("left side attached");
            self.leds.blink_all();
        } else {
            warn!("left side not responding (status {:#04x})", status.code());
        }

        self.debouncer.reset();
        self.reset_loop = 0;
        self.changed = false;
        self.scans = 0;
        self.rate.reset();
    }

    /// Scan every row once. Returns `true` if the debounced matrix changed.
    pub fn scan_once(&mut self) -> bool {
        if self.state() == ScanState::DeviceError {
            self.try_recover();
        }

        self.changed = false;
        for row in 0..ROWS {
            self.driver.select_row(row);
            let raw = self.driver.read_columns(row);
            if self.debouncer.apply(row, raw) {
                self.changed = true;
            }
            self.driver.unselect_rows();
        }
        self.debouncer.advance();
        self.scans = self.scans.wrapping_add(1);

        self.changed
    }

    /// [`scan_once`](Self::scan_once), then feed the scan-rate meter with
    /// the time from `clock`.
    pub fn scan_timed<C: Clock>(&mut self, clock: &mut C) -> bool {
        let changed = self.scan_once();
        self.rate.tick(clock.now_ms());
        changed
    }

    pub fn scan_count(&self) -> u32 {
        self.scans
    }

    /// Scans in the last closed one-second window of
    /// [`scan_timed`](Self::scan_timed) calls.
    pub fn scan_rate(&self) -> Option<u32> {
        self.rate.last()
    }

    fn try_recover(&mut self) {
        let attempt = self.reset_loop == 0;
        self.reset_loop = self.reset_loop.wrapping_add(1);
        if !attempt {
            return;
        }

        debug!("trying to reset mcp23018");
        if self.driver.init_expander().is_ok() {
            info!("left side attached");
            self.reset_loop = 0;
            self.leds.blink_all();
        } else {
            warn!("left side not responding");
        }
    }

    pub fn state(&self) -> ScanState {
        if self.driver.status().is_ok() {
            ScanState::Healthy
        } else {
            ScanState::DeviceError
        }
    }

    pub fn status(&self) -> DeviceStatus {
        self.driver.status()
    }

    /// Whether the last [`scan_once`](Self::scan_once) changed the matrix.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn matrix(&self) -> &LogicalMatrix {
        self.debouncer.matrix()
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.matrix().is_pressed(row, col)
    }

    pub fn row(&self, row: usize) -> MatrixRow {
        self.matrix().row(row)
    }

    pub fn pressed_count(&self) -> usize {
        self.matrix().pressed_count()
    }

    pub fn driver(&self) -> &RowDriver<B, P> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut RowDriver<B, P> {
        &mut self.driver
    }

    pub fn indicator(&self) -> &L {
        &self.leds
    }

    pub fn indicator_mut(&mut self) -> &mut L {
        &mut self.leds
    }
}
