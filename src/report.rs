//! Streaming accumulation of iteration samples and their averages

use std::fmt;
use std::time::Duration;

use crate::io_stats::IoStats;
use crate::timing::PhaseTiming;

/// Measurements of one successful iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterationSample {
    pub timing: PhaseTiming,
    /// Rows materialized; only read operations report this
    pub row_count: Option<u64>,
    pub io: IoStats,
}

/// Running sums over the successful iterations of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseSums {
    pub open: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
    pub total: Option<Duration>,
    pub rows: u64,
    pub io: IoStats,
    pub valid_iterations: usize,
}

fn add_opt(sum: Option<Duration>, value: Option<Duration>) -> Option<Duration> {
    match (sum, value) {
        (Some(s), Some(v)) => Some(s + v),
        (s, None) => s,
        (None, v) => v,
    }
}

impl PhaseSums {
    pub fn add(&mut self, sample: &IterationSample) {
        self.open = add_opt(self.open, sample.timing.open);
        self.read = add_opt(self.read, sample.timing.read);
        self.write = add_opt(self.write, sample.timing.write);
        self.total = add_opt(self.total, sample.timing.total);
        self.rows += sample.row_count.unwrap_or(0);
        self.io.add(&sample.io);
        self.valid_iterations += 1;
    }
}

/// Exact integer-nanosecond mean
fn average(sum: Duration, count: usize) -> Duration {
    let nanos = sum.as_nanos() / count as u128;
    Duration::new(
        (nanos / 1_000_000_000) as u64,
        (nanos % 1_000_000_000) as u32,
    )
}

/// Per-phase averages over the valid iterations of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateReport {
    pub valid_iterations: usize,
    pub avg_open: Option<Duration>,
    pub avg_read: Option<Duration>,
    pub avg_write: Option<Duration>,
    pub avg_total: Option<Duration>,
    pub avg_row_count: u64,
    /// Mean read/write calls and bytes per iteration
    pub avg_io: IoStats,
}

/// Outcome of aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Report(AggregateReport),
    /// No iteration succeeded, so there is nothing to average
    NoData,
}

impl Aggregate {
    pub fn report(&self) -> Option<&AggregateReport> {
        match self {
            Aggregate::Report(report) => Some(report),
            Aggregate::NoData => None,
        }
    }
}

/// Divide the sums by the number of valid iterations
pub fn aggregate(sums: &PhaseSums) -> Aggregate {
    let n = sums.valid_iterations;
    if n == 0 {
        return Aggregate::NoData;
    }
    Aggregate::Report(AggregateReport {
        valid_iterations: n,
        avg_open: sums.open.map(|d| average(d, n)),
        avg_read: sums.read.map(|d| average(d, n)),
        avg_write: sums.write.map(|d| average(d, n)),
        avg_total: sums.total.map(|d| average(d, n)),
        avg_row_count: sums.rows / n as u64,
        avg_io: sums.io.divide(n as u64),
    })
}

fn secs(d: Option<Duration>) -> String {
    d.map(|d| format!("{:.6}", d.as_secs_f64())).unwrap_or_default()
}

impl AggregateReport {
    pub fn csv_header() -> &'static str {
        concat!(
            "label,valid_iterations,avg_open_s,avg_read_s,avg_write_s,avg_total_s,avg_rows,",
            "avg_read_calls,avg_bytes_read,avg_write_calls,avg_bytes_written"
        )
    }

    /// One row for plotting; absent phases are left empty
    pub fn to_csv_row(&self, label: &str) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            label,
            self.valid_iterations,
            secs(self.avg_open),
            secs(self.avg_read),
            secs(self.avg_write),
            secs(self.avg_total),
            self.avg_row_count,
            self.avg_io.read_calls,
            self.avg_io.read_bytes,
            self.avg_io.write_calls,
            self.avg_io.write_bytes
        )
    }
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Valid iterations: {}", self.valid_iterations)?;
        if let Some(open) = self.avg_open {
            writeln!(f, "Average time to open file: {:.6} seconds", open.as_secs_f64())?;
        }
        if let Some(read) = self.avg_read {
            writeln!(f, "Average time to read table: {:.6} seconds", read.as_secs_f64())?;
        }
        if let Some(write) = self.avg_write {
            writeln!(f, "Average time to write file: {:.6} seconds", write.as_secs_f64())?;
        }
        if let Some(total) = self.avg_total {
            writeln!(f, "Average total time: {:.6} seconds", total.as_secs_f64())?;
        }
        writeln!(f, "Average number of rows: {}", self.avg_row_count)?;
        writeln!(
            f,
            "Average I/O calls: read {}, write {}",
            self.avg_io.read_calls, self.avg_io.write_calls
        )?;
        write!(
            f,
            "Average bytes read: {}, written: {}",
            self.avg_io.read_bytes, self.avg_io.write_bytes
        )
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Report(report) => fmt::Display::fmt(report, f),
            Aggregate::NoData => f.write_str("No valid iterations to calculate averages."),
        }
    }
}
