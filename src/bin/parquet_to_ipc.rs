use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use columnar_bench::config::DEFAULT_BATCH_SIZE;
use columnar_bench::{
    Aggregate, AggregateReport, Codec, ColumnarRuntime, ConversionPipeline, ConvertOperation,
    FileFormat, IterationDriver, RuntimeConfig,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

/// Benchmark converting a columnar file into the other format
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Input file (Parquet unless --input-format says otherwise)
    input: PathBuf,

    /// Output file (Arrow IPC unless --output-format says otherwise)
    output: PathBuf,

    /// Compression codec for the output: none, lz4 or zstd
    #[arg(long, default_value = "zstd", value_parser = Codec::from_str)]
    codec: Codec,

    /// Repeat the conversion and report averages instead of a single run
    #[arg(long, short)]
    iterations: Option<usize>,

    /// Input format; guessed from the extension when omitted
    #[arg(long, value_parser = FileFormat::from_str)]
    input_format: Option<FileFormat>,

    /// Output format; defaults to the counterpart of the input format
    #[arg(long, value_parser = FileFormat::from_str)]
    output_format: Option<FileFormat>,

    /// Skip re-reading the output to check rows and schema
    #[arg(long)]
    no_verify: bool,

    /// Drop the input from the page cache before each run
    #[arg(long)]
    drop_cache: bool,

    /// Requested worker threads
    #[arg(long, default_value = "1")]
    threads: NonZeroUsize,

    /// Rows per decoded batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Print one CSV row instead of the text report (repeated runs only)
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

    let input_format = args
        .input_format
        .or_else(|| FileFormat::from_path(&args.input))
        .unwrap_or(FileFormat::Parquet);
    let output_format = args
        .output_format
        .unwrap_or_else(|| input_format.counterpart());

    let runtime = ColumnarRuntime::new(
        RuntimeConfig::default()
            .with_worker_threads(args.threads)
            .with_batch_size(args.batch_size)
            .with_evict_page_cache(args.drop_cache),
    );
    println!("{}", runtime.describe());

    let pipeline = ConversionPipeline::new(&runtime, &args.input, &args.output, args.codec)
        .with_formats(input_format, output_format);

    match args.iterations {
        None => {
            let conversion = match pipeline.convert() {
                Ok(conversion) => conversion,
                Err(e) => {
                    eprintln!("Error during {} phase: {}", e.phase(), e);
                    std::process::exit(1);
                }
            };
            println!("{}", conversion.timing);
            println!("Rows converted: {}", conversion.rows);

            if !args.no_verify {
                if let Err(e) = pipeline.verify(&conversion) {
                    eprintln!("Verification failed: {}", e);
                    std::process::exit(1);
                }
                println!("Output verified: row count and schema match");
            }
        }
        Some(iterations) => {
            let mut driver =
                IterationDriver::new(ConvertOperation::from_pipeline(pipeline), iterations);
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
        }
    }

    Ok(())
}
