//! Thread-affinity control for the columnar I/O libraries
//!
//! arrow-rs and parquet-rs decode and encode synchronously on the calling
//! thread; they own no worker pool. Pinning the harness to one thread is
//! therefore a matter of never spawning work, and the effective thread
//! count is always one. A request for more threads is honoured only as a
//! recorded value that the reporter prints next to the effective count.

use std::num::NonZeroUsize;

use log::{debug, warn};

use crate::config::RuntimeConfig;

/// Columnar I/O runtime constrained by an explicit [`RuntimeConfig`]
#[derive(Debug, Clone)]
pub struct ColumnarRuntime {
    config: RuntimeConfig,
    effective_threads: NonZeroUsize,
}

impl ColumnarRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let effective_threads = NonZeroUsize::MIN;
        if config.worker_threads != effective_threads {
            warn!(
                "requested {} worker threads, but arrow/parquet decode runs on the calling thread; \
                 timings reflect {} thread",
                config.worker_threads, effective_threads
            );
        }
        debug!(
            "columnar runtime: batch_size={}, evict_page_cache={}",
            config.batch_size, config.evict_page_cache
        );
        Self {
            config,
            effective_threads,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of threads the I/O libraries actually use
    pub fn effective_threads(&self) -> usize {
        self.effective_threads.get()
    }

    /// Number of threads the caller asked for
    pub fn requested_threads(&self) -> usize {
        self.config.worker_threads.get()
    }

    /// True when the effective count differs from the request
    pub fn has_thread_mismatch(&self) -> bool {
        self.effective_threads != self.config.worker_threads
    }

    /// Host and library thread counts, printed ahead of every report
    pub fn describe(&self) -> String {
        let mut text = format!(
            "Number of CPU cores available: {}\nNumber of threads used by Arrow: {}",
            cpu_cores(),
            self.effective_threads()
        );
        if self.has_thread_mismatch() {
            text.push_str(&format!(" (requested {})", self.requested_threads()));
        }
        text
    }
}

impl Default for ColumnarRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

/// Logical CPU cores available to the process
pub fn cpu_cores() -> usize {
    num_cpus::get()
}

/// Physical CPU cores of the host
pub fn physical_cores() -> usize {
    num_cpus::get_physical()
}
