//! Iteration driver: repeats one benchmark operation and accumulates the
//! iterations that succeed

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{Codec, FileFormat};
use crate::error::BenchError;
use crate::io_stats::IoStatsTracker;
use crate::pipeline::ConversionPipeline;
use crate::reader::PhasedReader;
use crate::report::{aggregate, Aggregate, IterationSample, PhaseSums};
use crate::runtime::ColumnarRuntime;

/// Outcome of one iteration; the error carries the diagnostic of the
/// phase that failed
pub type IterationResult = Result<IterationSample, BenchError>;

/// A single benchmarked operation, repeated by [`IterationDriver`]
pub trait BenchOperation {
    /// Short name used in logs and CSV rows
    fn label(&self) -> &str;

    fn run_once(&mut self) -> IterationResult;
}

/// Phased read of one file
pub struct ReadOperation<'a> {
    runtime: &'a ColumnarRuntime,
    path: PathBuf,
    format: FileFormat,
    label: String,
}

impl<'a> ReadOperation<'a> {
    pub fn new(runtime: &'a ColumnarRuntime, path: impl AsRef<Path>, format: FileFormat) -> Self {
        let path = path.as_ref().to_path_buf();
        let label = format!("read:{}", path.display());
        Self {
            runtime,
            path,
            format,
            label,
        }
    }
}

impl BenchOperation for ReadOperation<'_> {
    fn label(&self) -> &str {
        &self.label
    }

    fn run_once(&mut self) -> IterationResult {
        let tracker = IoStatsTracker::new();
        let reader = PhasedReader::new(self.runtime).with_tracker(tracker.clone());
        let (timing, table) = reader.open_and_read(&self.path, self.format)?;
        Ok(IterationSample {
            timing,
            row_count: Some(table.num_rows() as u64),
            io: tracker.snapshot(),
        })
    }
}

/// Full conversion of one file, overwriting the same output each time
pub struct ConvertOperation<'a> {
    pipeline: ConversionPipeline<'a>,
    label: String,
}

impl<'a> ConvertOperation<'a> {
    pub fn new(
        runtime: &'a ColumnarRuntime,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        codec: Codec,
    ) -> Self {
        Self::from_pipeline(ConversionPipeline::new(runtime, input, output, codec))
    }

    pub fn from_pipeline(pipeline: ConversionPipeline<'a>) -> Self {
        let label = format!("convert:{}", pipeline.input().display());
        Self { pipeline, label }
    }
}

impl BenchOperation for ConvertOperation<'_> {
    fn label(&self) -> &str {
        &self.label
    }

    fn run_once(&mut self) -> IterationResult {
        let tracker = IoStatsTracker::new();
        let pipeline = self.pipeline.clone().with_tracker(tracker.clone());
        let conversion = pipeline.convert()?;
        Ok(IterationSample {
            timing: conversion.timing,
            row_count: Some(conversion.rows as u64),
            io: tracker.snapshot(),
        })
    }
}

/// External request to stop a run between iterations
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a driver run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    /// Running the given 1-based iteration
    Running(usize),
    /// Every requested iteration was attempted
    Completed,
    /// Stopped early by cancellation or deadline
    Aborted,
}

/// Result of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub label: String,
    pub state: DriverState,
    pub requested: usize,
    pub attempted: usize,
    pub failed: usize,
    pub sums: PhaseSums,
    /// Diagnostic of the most recent failed iteration
    pub last_error: Option<BenchError>,
}

impl RunSummary {
    pub fn valid_iterations(&self) -> usize {
        self.sums.valid_iterations
    }

    pub fn aggregate(&self) -> Aggregate {
        aggregate(&self.sums)
    }
}

/// Runs an operation up to N times; failed iterations are skipped, never fatal
pub struct IterationDriver<Op> {
    operation: Op,
    iterations: usize,
    cancel: CancelToken,
    deadline: Option<Duration>,
    state: DriverState,
}

impl<Op: BenchOperation> IterationDriver<Op> {
    pub fn new(operation: Op, iterations: usize) -> Self {
        Self {
            operation,
            iterations,
            cancel: CancelToken::new(),
            deadline: None,
            state: DriverState::Idle,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop starting new iterations once `limit` has elapsed
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn should_stop(&self, started: Instant) -> bool {
        self.cancel.is_cancelled()
            || self
                .deadline
                .is_some_and(|limit| started.elapsed() >= limit)
    }

    pub fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        let mut sums = PhaseSums::default();
        let mut attempted = 0;
        let mut failed = 0;
        let mut last_error = None;

        info!(
            "starting {} iterations of {}",
            self.iterations,
            self.operation.label()
        );

        self.state = DriverState::Completed;
        for i in 1..=self.iterations {
            if self.should_stop(started) {
                self.state = DriverState::Aborted;
                break;
            }
            self.state = DriverState::Running(i);
            attempted += 1;

            match self.operation.run_once() {
                Ok(sample) => {
                    debug!("iteration {}: {:?}", i, sample.timing);
                    sums.add(&sample);
                }
                Err(e) => {
                    warn!("iteration {} failed in {} phase: {}", i, e.phase(), e);
                    failed += 1;
                    last_error = Some(e);
                }
            }
            self.state = DriverState::Completed;
        }

        if self.state == DriverState::Aborted {
            warn!(
                "run of {} aborted after {} of {} iterations",
                self.operation.label(),
                attempted,
                self.iterations
            );
        }

        RunSummary {
            label: self.operation.label().to_string(),
            state: self.state,
            requested: self.iterations,
            attempted,
            failed,
            sums,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_stats::IoStats;
    use crate::timing::PhaseTiming;

    /// Fails on the listed 1-based calls, succeeds with fixed timings otherwise
    struct ScriptedOperation {
        calls: usize,
        fail_on: Vec<usize>,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl ScriptedOperation {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                calls: 0,
                fail_on,
                cancel_after: None,
            }
        }
    }

    impl BenchOperation for ScriptedOperation {
        fn label(&self) -> &str {
            "scripted"
        }

        fn run_once(&mut self) -> IterationResult {
            self.calls += 1;
            if let Some((n, token)) = &self.cancel_after {
                if self.calls == *n {
                    token.cancel();
                }
            }
            if self.fail_on.contains(&self.calls) {
                return Err(BenchError::open("flaky.parquet", "injected fault"));
            }
            let ms = self.calls as u64;
            Ok(IterationSample {
                timing: PhaseTiming {
                    open: Some(Duration::from_millis(ms)),
                    read: Some(Duration::from_millis(10 * ms)),
                    write: None,
                    total: Some(Duration::from_millis(12 * ms)),
                },
                row_count: Some(1000),
                io: IoStats {
                    read_calls: 2,
                    read_bytes: 64,
                    ..IoStats::default()
                },
            })
        }
    }

    #[test]
    fn test_failed_iterations_are_skipped() {
        let mut driver = IterationDriver::new(ScriptedOperation::new(vec![2, 4]), 5);
        assert_eq!(driver.state(), DriverState::Idle);
        let summary = driver.run();

        assert_eq!(summary.state, DriverState::Completed);
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.valid_iterations(), 3);

        // Calls 1, 3 and 5 succeeded: open 1+3+5 ms
        let report = *summary.aggregate().report().unwrap();
        assert_eq!(report.avg_open, Some(Duration::from_millis(9) / 3));
        assert_eq!(report.avg_read, Some(Duration::from_millis(90) / 3));
        assert_eq!(report.avg_row_count, 1000);
        assert_eq!(report.avg_io.read_calls, 2);
        assert_eq!(summary.last_error.unwrap().phase(), crate::error::Phase::Open);
    }

    #[test]
    fn test_all_failures_give_no_data() {
        let mut driver = IterationDriver::new(ScriptedOperation::new((1..=4).collect()), 4);
        let summary = driver.run();
        assert_eq!(summary.state, DriverState::Completed);
        assert_eq!(summary.valid_iterations(), 0);
        assert_eq!(summary.aggregate(), Aggregate::NoData);
    }

    #[test]
    fn test_zero_iterations() {
        let summary = IterationDriver::new(ScriptedOperation::new(vec![]), 0).run();
        assert_eq!(summary.state, DriverState::Completed);
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.aggregate(), Aggregate::NoData);
    }

    #[test]
    fn test_cancellation_keeps_completed_iterations() {
        let token = CancelToken::new();
        let mut op = ScriptedOperation::new(vec![]);
        op.cancel_after = Some((3, token.clone()));

        let mut driver = IterationDriver::new(op, 10).with_cancel_token(token);
        let summary = driver.run();

        assert_eq!(summary.state, DriverState::Aborted);
        assert_eq!(driver.state(), DriverState::Aborted);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.valid_iterations(), 3);
        assert!(summary.aggregate().report().is_some());
    }

    #[test]
    fn test_expired_deadline_aborts_before_first_iteration() {
        let mut driver =
            IterationDriver::new(ScriptedOperation::new(vec![]), 3).with_deadline(Duration::ZERO);
        let summary = driver.run();
        assert_eq!(summary.state, DriverState::Aborted);
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.aggregate(), Aggregate::NoData);
    }
}
