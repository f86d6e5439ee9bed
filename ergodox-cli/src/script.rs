use anyhow::{bail, Context, Result};
use ergodox_matrix::{MatrixRow, COLS, ROWS};

/// Something that happens to the simulated board before a given scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press { row: usize, col: usize },
    Release { row: usize, col: usize },
    /// Replace the raw switch state of a whole row.
    Row { row: usize, bits: MatrixRow },
    /// Disconnect the left half.
    Unplug,
    /// Reconnect the left half.
    Plug,
}

/// An action applied just before scan number `scan` (1-based). Scan 0 means
/// before the matrix is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub scan: usize,
    pub action: Action,
}

/// Parse a scan script.
///
/// One step per line: `<scan> <action> [args]`, where action is one of
/// `press <row> <col>`, `release <row> <col>`, `row <row> <bits>`,
/// `unplug` or `plug`. Bits accept `0b`, `0x` or decimal notation.
/// `#` starts a comment. Steps are returned ordered by scan, keeping file
/// order within a scan.
pub fn parse_script(input: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    for (line_num, line) in input.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let step = parse_step(line).with_context(|| format!("line {}", line_num + 1))?;
        steps.push(step);
    }

    steps.sort_by_key(|s| s.scan);
    Ok(steps)
}

fn parse_step(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let scan = words.next().context("missing scan number")?;
    let scan: usize = scan
        .parse()
        .with_context(|| format!("invalid scan number '{}'", scan))?;

    let keyword = words.next().context("missing action")?;
    let action = match keyword {
        "press" | "release" => {
            let row = parse_row(words.next())?;
            let col = parse_col(words.next())?;
            if keyword == "press" {
                Action::Press { row, col }
            } else {
                Action::Release { row, col }
            }
        }
        "row" => {
            let row = parse_row(words.next())?;
            let bits = parse_bits(words.next().context("missing row bits")?)?;
            Action::Row { row, bits }
        }
        "unplug" => Action::Unplug,
        "plug" => Action::Plug,
        other => bail!("unknown action '{}'", other),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected '{}' after {}", extra, keyword);
    }

    Ok(Step { scan, action })
}

fn parse_row(word: Option<&str>) -> Result<usize> {
    let word = word.context("missing row")?;
    let row: usize = word.parse().with_context(|| format!("invalid row '{}'", word))?;
    if row >= ROWS {
        bail!("row {} out of range (0..{})", row, ROWS);
    }
    Ok(row)
}

fn parse_col(word: Option<&str>) -> Result<usize> {
    let word = word.context("missing column")?;
    let col: usize = word
        .parse()
        .with_context(|| format!("invalid column '{}'", word))?;
    if col >= COLS {
        bail!("column {} out of range (0..{})", col, COLS);
    }
    Ok(col)
}

fn parse_bits(word: &str) -> Result<MatrixRow> {
    let cleaned = word.replace('_', "");
    let parsed = if let Some(bin) = cleaned.strip_prefix("0b") {
        u16::from_str_radix(bin, 2)
    } else if let Some(hex) = cleaned.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)
    } else {
        cleaned.parse::<u16>()
    };
    let value = parsed.with_context(|| format!("invalid row bits '{}'", word))?;

    if value >= 1 << COLS {
        bail!("row bits '{}' exceed {} columns", word, COLS);
    }
    Ok(value as MatrixRow)
}
