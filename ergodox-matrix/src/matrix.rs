//! Debounced key state.

use core::fmt;

use crate::config::{MatrixRow, COLS, ROWS};

/// Debounced matrix state (1: on, 0: off), one [`MatrixRow`] per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalMatrix {
    rows: [MatrixRow; ROWS],
}

impl LogicalMatrix {
    pub const fn new() -> Self {
        Self { rows: [0; ROWS] }
    }

    pub const fn rows(&self) -> usize {
        ROWS
    }

    pub const fn cols(&self) -> usize {
        COLS
    }

    /// Bits of `row`, or 0 for a row outside the matrix.
    pub fn row(&self, row: usize) -> MatrixRow {
        self.rows.get(row).copied().unwrap_or(0)
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        col < COLS && self.row(row) & (1 << col) != 0
    }

    /// Number of keys currently pressed.
    pub fn pressed_count(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    /// Every pressed `(row, col)`, row-major.
    pub fn pressed(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, &bits)| {
            (0..COLS)
                .filter(move |&col| bits & (1 << col) != 0)
                .map(move |col| (row, col))
        })
    }

    pub(crate) fn toggle(&mut self, row: usize, changes: MatrixRow) {
        self.rows[row] ^= changes;
    }

    pub(crate) fn clear(&mut self) {
        self.rows = [0; ROWS];
    }
}

/// Diagnostic dump: a header, then each row with column 0 first.
impl fmt::Display for LogicalMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("r ")?;
        for col in 0..COLS {
            write!(f, "{}", col % 10)?;
        }
        f.write_str("\n")?;
        for (row, &bits) in self.rows.iter().enumerate() {
            write!(f, "{:02X}: ", row)?;
            for col in 0..COLS {
                f.write_str(if bits & (1 << col) != 0 { "1" } else { "0" })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogicalMatrix {
        let mut m = LogicalMatrix::new();
        m.toggle(0, 0b00_0001);
        m.toggle(12, 0b10_0100);
        m
    }

    #[test]
    fn accessors_agree() {
        let m = sample();
        for row in 0..ROWS {
            for col in 0..COLS {
                assert_eq!(m.is_pressed(row, col), m.row(row) >> col & 1 == 1);
            }
        }
        assert_eq!(m.pressed_count(), 3);
        assert_eq!(
            m.pressed().collect::<std::vec::Vec<_>>(),
            [(0, 0), (12, 2), (12, 5)]
        );
    }

    #[test]
    fn out_of_range_reads_released() {
        let m = sample();
        assert_eq!(m.row(ROWS), 0);
        assert!(!m.is_pressed(0, COLS));
        assert!(!m.is_pressed(ROWS + 3, 0));
    }

    #[test]
    fn dump_prints_column_zero_first() {
        let dump = std::format!("{}", sample());
        let lines: std::vec::Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "r 012345");
        assert_eq!(lines[1], "00: 100000");
        assert_eq!(lines[13], "0C: 001001");
        assert_eq!(lines[14], "0D: 000000");
        assert_eq!(lines.len(), ROWS + 1);
    }
}
