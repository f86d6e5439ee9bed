//! Replay a scan script through the scanner on the simulated board.

use ergodox_matrix::sim::{SimClock, SimScanner};
use ergodox_matrix::{ScanState, DEBOUNCE};
use log::debug;

use crate::script::{Action, Step};

/// What happened over a replay.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub scans: usize,
    /// Scan numbers whose pass changed the matrix.
    pub changed_on: Vec<usize>,
    /// Scans per simulated second, from the last full window.
    pub scan_rate: Option<u32>,
}

pub struct Options {
    /// Number of scans; defaults to enough to let the last step settle.
    pub scans: Option<usize>,
    /// Print the matrix after every changing scan.
    pub dump_changes: bool,
    /// Simulated time one scan pass takes.
    pub scan_period_us: u64,
}

pub fn replay(steps: &[Step], options: &Options) -> (SimScanner, Summary) {
    let last = steps.last().map_or(0, |s| s.scan);
    let total = options.scans.unwrap_or(last + DEBOUNCE + 1);

    let mut scanner: SimScanner = SimScanner::default();
    let mut clock = SimClock::new();
    let mut pending = steps.iter().peekable();

    while let Some(step) = pending.next_if(|s| s.scan == 0) {
        apply(&mut scanner, step.action);
    }
    scanner.initialize();

    let mut summary = Summary::default();
    for scan in 1..=total {
        while let Some(step) = pending.next_if(|s| s.scan <= scan) {
            debug!("scan {}: {:?}", scan, step.action);
            apply(&mut scanner, step.action);
        }

        let state = scanner.state();
        let changed = scanner.scan_timed(&mut clock);
        clock.advance_us(options.scan_period_us);
        if changed {
            summary.changed_on.push(scan);
            println!(
                "scan {:>5}: changed, {} pressed{}",
                scan,
                scanner.pressed_count(),
                if state == ScanState::DeviceError {
                    " (left half offline)"
                } else {
                    ""
                }
            );
            if options.dump_changes {
                print!("{}", scanner.matrix());
            }
        }
        if scanner.state() != state {
            println!("scan {:>5}: left half {:?}", scan, scanner.state());
        }
    }
    summary.scans = total;
    summary.scan_rate = scanner.scan_rate();

    (scanner, summary)
}

fn apply(scanner: &mut SimScanner, action: Action) {
    match action {
        Action::Press { row, col } => scanner.set_key(row, col, true),
        Action::Release { row, col } => scanner.set_key(row, col, false),
        Action::Row { row, bits } => scanner.set_raw_row(row, bits),
        Action::Unplug => scanner.set_expander_online(false),
        Action::Plug => scanner.set_expander_online(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;

    fn run(script: &str, scans: Option<usize>) -> (SimScanner, Summary) {
        let steps = parse_script(script).unwrap();
        replay(
            &steps,
            &Options {
                scans,
                dump_changes: false,
                scan_period_us: 3_000,
            },
        )
    }

    #[test]
    fn press_and_release_are_reported() {
        let (scanner, summary) = run("1 press 3 2\n2 release 3 2\n", None);
        // Release is held back until the window has passed.
        assert_eq!(summary.changed_on, [1, 1 + DEBOUNCE]);
        assert_eq!(scanner.pressed_count(), 0);
        assert_eq!(summary.scans, 2 + DEBOUNCE + 1);
    }

    #[test]
    fn unplugged_at_boot_recovers_on_wrap() {
        let (scanner, _) = run("0 unplug\n1 row 0 0b11\n10 plug\n", Some(257));
        assert_eq!(scanner.state(), ScanState::Healthy);
        assert_eq!(scanner.row(0), 0b11);
    }

    #[test]
    fn scan_rate_follows_simulated_time() {
        let (_, summary) = run("1 press 0 0\n", Some(700));
        // 3 ms per pass: the first window closes on pass 335, the second on 669.
        assert_eq!(summary.scan_rate, Some(334));

        let (_, summary) = run("", Some(100));
        assert_eq!(summary.scan_rate, None);
    }
}
