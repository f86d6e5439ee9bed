mod replay;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ergodox_matrix::config::{
    LOCAL_COLUMN_BITS, LOCAL_COLUMN_PORT, LOCAL_ROW_PINS, REMOTE_COLUMN_BITS, REMOTE_ROWS,
};
use ergodox_matrix::{DEBOUNCE, ROWS};
use log::LevelFilter;
use std::fs;

#[derive(Parser)]
#[command(name = "ergodox-cli")]
#[command(about = "ErgoDox key matrix simulator")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scan script through the debounced scanner
    Simulate {
        /// Path to the scan script
        script: String,
        /// Number of scans to run (default: until the last step settles)
        #[arg(long)]
        scans: Option<usize>,
        /// Print the matrix after every scan that changed it
        #[arg(long)]
        dump: bool,
        /// Simulated duration of one scan pass, in microseconds
        #[arg(long, default_value_t = 3000)]
        scan_period_us: u64,
    },
    /// Print the row and column wiring of both halves
    Wiring,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Command::Simulate {
            script: path,
            scans,
            dump,
            scan_period_us,
        } => {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            let steps = script::parse_script(&contents)
                .with_context(|| format!("parsing scan script {}", path))?;

            println!(
                "Replaying {} steps, debounce window {} scans",
                steps.len(),
                DEBOUNCE
            );

            let options = replay::Options {
                scans,
                dump_changes: dump,
                scan_period_us,
            };
            let (scanner, summary) = replay::replay(&steps, &options);

            println!(
                "{} scans, {} changed the matrix",
                summary.scans,
                summary.changed_on.len()
            );
            if let Some(rate) = summary.scan_rate {
                println!("scan rate: {} scans per simulated second", rate);
            }
            print!("{}", scanner.matrix());
            println!("pressed: {}", scanner.pressed_count());
            println!(
                "left half: {:?} (status {:#04x})",
                scanner.state(),
                scanner.status().code()
            );
        }
        Command::Wiring => {
            println!("row  pin");
            for row in 0..REMOTE_ROWS {
                println!("{:>3}  MCP23018 A{}", row, row);
            }
            for row in REMOTE_ROWS..ROWS {
                let pin = LOCAL_ROW_PINS[row - REMOTE_ROWS];
                println!("{:>3}  Teensy {:?}{}", row, pin.port, pin.bit);
            }
            println!();
            println!("col  Teensy  MCP23018");
            for (col, (local, remote)) in LOCAL_COLUMN_BITS
                .iter()
                .zip(REMOTE_COLUMN_BITS.iter())
                .enumerate()
            {
                println!("{:>3}  {:?}{}      B{}", col, LOCAL_COLUMN_PORT, local, remote);
            }
        }
    }

    Ok(())
}
