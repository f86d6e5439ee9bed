//! End-to-end scanning against the simulated board.

use ergodox_matrix::sim::SimScanner;
use ergodox_matrix::{matrix_cols, matrix_rows, ScanState, COLS, ROWS};

fn scanner<const N: usize>() -> SimScanner<N> {
    let mut s: SimScanner<N> = SimScanner::default();
    s.initialize();
    s
}

/// Scan `count` times, returning the change flag of each pass.
fn scan_n<const N: usize>(s: &mut SimScanner<N>, count: usize) -> Vec<bool> {
    (0..count).map(|_| s.scan_once()).collect()
}

// ---------------------------------------------------------------------------
// Debouncing
// ---------------------------------------------------------------------------

fn single_toggle_is_reported_once<const N: usize>() {
    for row in 0..ROWS {
        let mut s = scanner::<N>();
        s.set_key(row, 4, true);

        let flags = scan_n(&mut s, N + 5);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1, "row {row}, N = {N}");
        assert!(flags[0]);
        assert!(s.is_pressed(row, 4));
        assert_eq!(s.pressed_count(), 1);
    }
}

#[test]
fn single_toggle_for_various_windows() {
    single_toggle_is_reported_once::<1>();
    single_toggle_is_reported_once::<2>();
    single_toggle_is_reported_once::<3>();
    single_toggle_is_reported_once::<5>();
}

#[test]
fn documented_scenario_row_two() {
    let mut s = scanner::<3>();
    assert_eq!(matrix_rows(), 14);
    assert_eq!(matrix_cols(), 6);

    s.set_raw_row(2, 0b00_0001);
    let flags = scan_n(&mut s, 4);

    assert_eq!(flags, [true, false, false, false]);
    assert_eq!(s.row(2), 0b00_0001);
    for row in (0..ROWS).filter(|&r| r != 2) {
        assert_eq!(s.row(row), 0);
    }
}

#[test]
fn bounce_burst_gives_one_transition() {
    let mut s = scanner::<4>();
    let mut transitions = 0;
    for &pressed in &[true, false, true, false, true, true, true, true] {
        s.set_key(9, 0, pressed);
        if s.scan_once() {
            transitions += 1;
        }
    }
    assert_eq!(transitions, 1);
    assert!(s.is_pressed(9, 0));
}

#[test]
fn release_waits_for_window() {
    let mut s = scanner::<3>();
    s.set_key(12, 2, true);
    assert!(s.scan_once());

    s.set_key(12, 2, false);
    assert!(!s.scan_once());
    assert!(!s.scan_once());
    assert!(s.is_pressed(12, 2));

    assert!(s.scan_once());
    assert!(!s.is_pressed(12, 2));
    assert_eq!(s.pressed_count(), 0);
}

#[test]
fn quiet_scans_are_idempotent() {
    let mut s = scanner::<3>();
    s.set_key(1, 1, true);
    s.set_key(13, 5, true);
    scan_n(&mut s, 5);

    let before = *s.matrix();
    for _ in 0..50 {
        assert!(!s.scan_once());
        assert!(!s.changed());
    }
    assert_eq!(*s.matrix(), before);
}

#[test]
fn is_pressed_matches_row_bits() {
    let mut s = scanner::<3>();
    for row in 0..ROWS {
        s.set_raw_row(row, (row as u8 * 7) & 0b11_1111);
    }
    s.scan_once();

    for row in 0..ROWS {
        for col in 0..COLS {
            assert_eq!(s.is_pressed(row, col), s.row(row) & (1 << col) != 0);
        }
    }
    let total: u32 = (0..ROWS).map(|r| s.row(r).count_ones()).sum();
    assert_eq!(s.pressed_count(), total as usize);
    assert_eq!(s.matrix().pressed().count(), total as usize);
}

// ---------------------------------------------------------------------------
// Expander faults
// ---------------------------------------------------------------------------

#[test]
fn expander_fault_only_affects_left_rows() {
    let mut s = scanner::<3>();
    for row in 0..ROWS {
        s.set_raw_row(row, 0b00_0011);
    }
    scan_n(&mut s, 4);
    assert_eq!(s.pressed_count(), ROWS * 2);

    s.set_expander_online(false);
    scan_n(&mut s, 4);
    assert_eq!(s.state(), ScanState::DeviceError);

    for row in 0..7 {
        assert_eq!(s.row(row), 0, "left row {row} should read released");
    }
    for row in 7..ROWS {
        assert_eq!(s.row(row), 0b00_0011, "right row {row} should be unaffected");
    }

    s.set_raw_row(10, 0b10_0000);
    scan_n(&mut s, 4);
    assert_eq!(s.row(10), 0b10_0000);
}

#[test]
fn recovery_is_throttled_to_every_256_scans() {
    let mut s: SimScanner = SimScanner::default();
    s.set_expander_online(false);
    s.initialize();
    assert_eq!(s.state(), ScanState::DeviceError);

    let mut attempts = Vec::new();
    for call in 1..=600 {
        let before = s.driver().expander().bus().transactions();
        s.scan_once();
        if s.driver().expander().bus().transactions() != before {
            attempts.push(call);
        }
    }
    assert_eq!(attempts, [1, 257, 513]);
    assert_eq!(s.indicator().blinks(), 0);
}

#[test]
fn recovered_expander_rows_come_back() {
    let mut s: SimScanner = SimScanner::default();
    s.set_expander_online(false);
    s.initialize();
    s.set_raw_row(4, 0b01_0000);

    scan_n(&mut s, 10);
    assert_eq!(s.row(4), 0);

    s.set_expander_online(true);
    // Next retry happens when the counter wraps.
    scan_n(&mut s, 246);
    assert_eq!(s.state(), ScanState::DeviceError);
    scan_n(&mut s, 1);
    assert_eq!(s.state(), ScanState::Healthy);
    assert_eq!(s.row(4), 0b01_0000);
    assert_eq!(s.indicator().blinks(), 1);
}

#[test]
fn dump_lists_every_row() {
    let mut s = scanner::<3>();
    s.set_key(7, 0, true);
    s.scan_once();

    let dump = s.matrix().to_string();
    let mut lines = dump.lines();
    assert_eq!(lines.next(), Some("r 012345"));
    assert_eq!(lines.nth(7), Some("07: 100000"));
    assert_eq!(dump.lines().count(), ROWS + 1);
}
