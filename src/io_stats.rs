//! Byte and call counters for the file handles a benchmark iteration opens

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counters, cloned into every handle of one iteration.
///
/// Parquet's `ChunkReader` must be `Send + Sync`, so the counters are
/// atomics even though the harness itself is single-threaded.
#[derive(Debug, Clone, Default)]
pub struct IoStatsTracker {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    read_calls: AtomicU64,
    read_bytes: AtomicU64,
    write_calls: AtomicU64,
    write_bytes: AtomicU64,
}

impl IoStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self, bytes: u64) {
        self.inner.read_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.read_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_write(&self, bytes: u64) {
        self.inner.write_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.write_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IoStats {
        IoStats {
            read_calls: self.inner.read_calls.load(Ordering::Relaxed),
            read_bytes: self.inner.read_bytes.load(Ordering::Relaxed),
            write_calls: self.inner.write_calls.load(Ordering::Relaxed),
            write_bytes: self.inner.write_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of an [`IoStatsTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoStats {
    pub read_calls: u64,
    pub read_bytes: u64,
    pub write_calls: u64,
    pub write_bytes: u64,
}

impl IoStats {
    /// Fold another iteration's counters into a running total
    pub fn add(&mut self, other: &IoStats) {
        self.read_calls += other.read_calls;
        self.read_bytes += other.read_bytes;
        self.write_calls += other.write_calls;
        self.write_bytes += other.write_bytes;
    }

    /// Per-iteration mean of a running total, floored
    pub fn divide(&self, iterations: u64) -> IoStats {
        IoStats {
            read_calls: self.read_calls / iterations,
            read_bytes: self.read_bytes / iterations,
            write_calls: self.write_calls / iterations,
            write_bytes: self.write_bytes / iterations,
        }
    }
}
