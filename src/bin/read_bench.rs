use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use columnar_bench::config::{DEFAULT_BATCH_SIZE, DEFAULT_ITERATIONS};
use columnar_bench::{
    Aggregate, AggregateReport, ColumnarRuntime, FileFormat, IterationDriver, ReadOperation,
    RuntimeConfig,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Benchmark opening and fully reading a Parquet or Arrow IPC file
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// File to read
    input: PathBuf,

    /// Number of iterations to average over
    #[arg(default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// File format; guessed from the extension when omitted
    #[arg(long, value_parser = FileFormat::from_str)]
    format: Option<FileFormat>,

    /// Rows per decoded batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Drop the file from the page cache before each iteration
    #[arg(long)]
    drop_cache: bool,

    /// Requested worker threads
    #[arg(long, default_value = "1")]
    threads: NonZeroUsize,

    /// Stop starting new iterations after this many seconds
    #[arg(long)]
    max_seconds: Option<f64>,

    /// Print one CSV row instead of the text report
    #[arg(long)]
    csv: bool,

    /// Verbose logging output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    let args = parse_args();

    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let format = args
        .format
        .or_else(|| FileFormat::from_path(&args.input))
        .unwrap_or(FileFormat::Parquet);

    let runtime = ColumnarRuntime::new(
        RuntimeConfig::default()
            .with_worker_threads(args.threads)
            .with_batch_size(args.batch_size)
            .with_evict_page_cache(args.drop_cache),
    );
    println!("{}", runtime.describe());

    let operation = ReadOperation::new(&runtime, &args.input, format);
    let mut driver = IterationDriver::new(operation, args.iterations);
    if let Some(secs) = args.max_seconds {
        let limit = Duration::try_from_secs_f64(secs)
            .map_err(|e| anyhow::anyhow!("invalid --max-seconds {}: {}", secs, e))?;
        driver = driver.with_deadline(limit);
    }

    let summary = driver.run();
    if let Some(e) = &summary.last_error {
        eprintln!(
            "{} of {} iterations failed; last error: {}",
            summary.failed, summary.attempted, e
        );
    }

    match summary.aggregate() {
        Aggregate::Report(report) if args.csv => {
            println!("{}", AggregateReport::csv_header());
            println!("{}", report.to_csv_row(&summary.label));
        }
        aggregate => println!("{}", aggregate),
    }

    Ok(())
}
