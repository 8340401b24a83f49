use std::path::PathBuf;

use anyhow::{anyhow, Result};
use benchparse_rs::{parse_log_file, render_table, write_csv};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "benchparse",
    about = "Extract serving benchmark metrics from log files"
)]
struct Args {
    /// Path to the benchmark log file to parse
    logfile: PathBuf,

    /// Save results to a CSV file; uses "benchmark_results.csv" when no name is given
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "benchmark_results.csv"
    )]
    csv: Option<PathBuf>,

    /// Show only the headline columns (model, topology, throughput, latency)
    #[arg(long)]
    compact: bool,

    /// Skip screen output and only write the CSV file
    #[arg(long)]
    no_screen: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.no_screen && args.csv.is_none() {
        return Err(anyhow!("--no-screen requires --csv"));
    }

    let runs = parse_log_file(&args.logfile)?;

    if !args.no_screen {
        println!("Benchmark Results Summary:");
        println!("{}", "=".repeat(120));
        println!("{}", render_table(&runs, args.compact));
        println!("\nTotal runs parsed: {}", runs.len());
    }

    if let Some(path) = &args.csv {
        write_csv(&runs, path)?;
        if !args.no_screen {
            println!("\nResults saved to: {}", path.display());
        }
    }

    Ok(())
}
