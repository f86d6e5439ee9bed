//! Scan-rate meter.
//!
//! Counts scans and, once more than a second has passed since the window
//! opened, logs "matrix scans per second" at debug level and starts over.

use log::debug;

/// Length of one measurement window.
pub const RATE_WINDOW_MS: u32 = 1000;

/// Free-running millisecond time source. Wrapping is fine.
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanRate {
    /// Start of the current window; `None` until the first scan.
    window_start: Option<u32>,
    count: u32,
    last: Option<u32>,
}

impl ScanRate {
    pub const fn new() -> Self {
        Self {
            window_start: None,
            count: 0,
            last: None,
        }
    }

    /// Record one scan at `now_ms`. Returns the window's scan count when the
    /// window closes.
    pub fn tick(&mut self, now_ms: u32) -> Option<u32> {
        self.count = self.count.wrapping_add(1);
        let start = *self.window_start.get_or_insert(now_ms);
        if now_ms.wrapping_sub(start) <= RATE_WINDOW_MS {
            return None;
        }

        let rate = self.count;
        debug!("matrix scans per second: {}", rate);
        self.window_start = Some(now_ms);
        self.count = 0;
        self.last = Some(rate);
        Some(rate)
    }

    /// Count reported by the most recently closed window.
    pub fn last(&self) -> Option<u32> {
        self.last
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
