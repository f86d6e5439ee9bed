//! Debouncing by change history.
//!
//! A change is accepted as soon as it is seen, but the column is then locked
//! for `DEPTH` scans: further flips (contact bounce) are ignored until the
//! lock ages out. Latency for the first edge is therefore zero, and a key
//! can change state at most once every `DEPTH` scans.

use log::trace;

use crate::config::{MatrixRow, DEBOUNCE, ROWS};
use crate::matrix::LogicalMatrix;

pub struct Debouncer<const DEPTH: usize = DEBOUNCE> {
    matrix: LogicalMatrix,
    /// `history[d][row]` has a bit set for every column that changed
    /// recently. Slot 0 is the oldest; every recorded change is OR-ed into
    /// all slots, so slot 0 always holds the union of the window.
    history: [[MatrixRow; ROWS]; DEPTH],
}

impl<const DEPTH: usize> Debouncer<DEPTH> {
    const DEPTH_OK: () = assert!(DEPTH >= 1, "debounce window must be at least one scan");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::DEPTH_OK;
        Self {
            matrix: LogicalMatrix::new(),
            history: [[0; ROWS]; DEPTH],
        }
    }

    pub fn matrix(&self) -> &LogicalMatrix {
        &self.matrix
    }

    /// Forget all key state and history.
    pub fn reset(&mut self) {
        self.matrix.clear();
        self.history = [[0; ROWS]; DEPTH];
    }

    /// Columns of `row` that are still settling. Rows past the matrix have
    /// none.
    pub fn unsettled(&self, row: usize) -> MatrixRow {
        self.history
            .iter()
            .fold(0, |acc, slot| acc | slot.get(row).copied().unwrap_or(0))
    }

    /// Feed one raw sample for `row`. Returns `true` if the matrix changed.
    pub fn apply(&mut self, row: usize, raw: MatrixRow) -> bool {
        if row >= ROWS {
            return false;
        }
        let changes = self.matrix.row(row) ^ raw;
        let mask = !self.unsettled(row);

        if changes != 0 && changes & mask == 0 {
            trace!(
                "masked changes in row {:02X}: {:#04x}, demasked: {:#04x}",
                row,
                changes,
                changes & mask
            );
        }

        // Mask out keys that have changed recently.
        let changes = changes & mask;
        if changes == 0 {
            return false;
        }

        self.matrix.toggle(row, changes);
        for slot in self.history.iter_mut() {
            slot[row] |= changes;
        }
        true
    }

    /// Age the history by one scan. Call once per full pass.
    pub fn advance(&mut self) {
        self.history.copy_within(1.., 0);
        self.history[DEPTH - 1] = [0; ROWS];
    }
}

impl<const DEPTH: usize> Default for Debouncer<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}
