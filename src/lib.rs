// Implementations
pub mod config;
pub mod driver;
pub mod error;
pub mod file_manager;
pub mod io_stats;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod runtime;
pub mod timing;
pub mod tracked_file;
pub mod writer;

#[cfg(test)]
mod test_support;

// Export the main types
pub use config::{Codec, FileFormat, RuntimeConfig};
pub use driver::{
    BenchOperation, CancelToken, ConvertOperation, DriverState, IterationDriver,
    IterationResult, ReadOperation, RunSummary,
};
pub use error::{BenchError, Phase, Result};
pub use io_stats::{IoStats, IoStatsTracker};
pub use pipeline::{convert, Conversion, ConversionPipeline};
pub use reader::{open_and_read, PhasedReader, Table};
pub use report::{aggregate, Aggregate, AggregateReport, IterationSample, PhaseSums};
pub use runtime::{cpu_cores, physical_cores, ColumnarRuntime};
pub use timing::PhaseTiming;
pub use writer::PhasedWriter;
