//! Phased file reader: open (metadata only) then read (all row data)

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::config::FileFormat;
use crate::error::{BenchError, Phase, Result};
use crate::file_manager::evict_page_cache;
use crate::io_stats::IoStatsTracker;
use crate::runtime::ColumnarRuntime;
use crate::timing::{PhaseClock, PhaseTiming};
use crate::tracked_file::TrackedFile;

/// Fully materialized table: every row group or record batch of a file,
/// kept in file order under one schema
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Copy all batches into one contiguous batch
    pub fn combine(&self) -> std::result::Result<RecordBatch, ArrowError> {
        concat_batches(&self.schema, &self.batches)
    }
}

/// True when both schemas have the same column names and types in the
/// same order. Nullability and metadata are not compared.
pub fn same_columns(left: &Schema, right: &Schema) -> bool {
    left.fields().len() == right.fields().len()
        && left
            .fields()
            .iter()
            .zip(right.fields().iter())
            .all(|(l, r)| l.name() == r.name() && l.data_type() == r.data_type())
}

/// A file whose metadata has been parsed but whose rows are still on disk
enum OpenedFile {
    Parquet(ParquetRecordBatchReaderBuilder<TrackedFile>),
    Ipc(FileReader<TrackedFile>),
}

impl OpenedFile {
    fn open(path: &Path, format: FileFormat, tracker: IoStatsTracker) -> Result<Self> {
        let file = TrackedFile::open(path, tracker).map_err(|e| BenchError::open(path, e))?;
        match format {
            FileFormat::Parquet => {
                let builder = ParquetRecordBatchReaderBuilder::try_new(file)
                    .map_err(|e| BenchError::open(path, e))?;
                debug!(
                    "opened parquet {:?}: {} row groups, {} rows",
                    path,
                    builder.metadata().num_row_groups(),
                    builder.metadata().file_metadata().num_rows()
                );
                Ok(OpenedFile::Parquet(builder))
            }
            FileFormat::Ipc => {
                let reader =
                    FileReader::try_new(file, None).map_err(|e| BenchError::open(path, e))?;
                debug!("opened ipc {:?}: {} record batches", path, reader.num_batches());
                Ok(OpenedFile::Ipc(reader))
            }
        }
    }

    fn read_all(self, path: &Path, batch_size: usize) -> Result<Table> {
        match self {
            OpenedFile::Parquet(builder) => {
                let schema = builder.schema().clone();
                let reader = builder
                    .with_batch_size(batch_size)
                    .build()
                    .map_err(|e| BenchError::decode(path, e))?;
                let batches = reader
                    .collect::<std::result::Result<Vec<_>, ArrowError>>()
                    .map_err(|e| BenchError::decode(path, e))?;
                Ok(Table::new(schema, batches))
            }
            OpenedFile::Ipc(reader) => {
                let schema = reader.schema();
                let batches = reader
                    .collect::<std::result::Result<Vec<_>, ArrowError>>()
                    .map_err(|e| BenchError::decode(path, e))?;
                Ok(Table::new(schema, batches))
            }
        }
    }
}

/// Drop the input from the page cache when the runtime asks for cold
/// reads. Failures only cost warmth, so they are logged and ignored.
pub(crate) fn prepare_input(path: &Path, runtime: &ColumnarRuntime) {
    if !runtime.config().evict_page_cache {
        return;
    }
    match File::open(path).and_then(|f| evict_page_cache(f.as_raw_fd())) {
        Ok(()) => debug!("evicted {:?} from page cache", path),
        Err(e) => debug!("could not evict {:?} from page cache: {}", path, e),
    }
}

/// Run the open and read phases on an already started clock
pub(crate) fn read_phases(
    clock: &mut PhaseClock,
    path: &Path,
    format: FileFormat,
    runtime: &ColumnarRuntime,
    tracker: &IoStatsTracker,
) -> Result<Table> {
    let opened = clock.measure(Phase::Open, || OpenedFile::open(path, format, tracker.clone()))?;
    clock.measure(Phase::Read, || {
        opened.read_all(path, runtime.config().batch_size)
    })
}

/// Reads whole columnar files, timing the open and read phases apart
#[derive(Debug, Clone)]
pub struct PhasedReader<'a> {
    runtime: &'a ColumnarRuntime,
    tracker: IoStatsTracker,
}

impl<'a> PhasedReader<'a> {
    pub fn new(runtime: &'a ColumnarRuntime) -> Self {
        Self {
            runtime,
            tracker: IoStatsTracker::new(),
        }
    }

    pub fn with_tracker(mut self, tracker: IoStatsTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &IoStatsTracker {
        &self.tracker
    }

    /// Open `path` as `format` and decode every row into memory.
    ///
    /// Any failure discards the timing gathered so far.
    pub fn open_and_read(
        &self,
        path: impl AsRef<Path>,
        format: FileFormat,
    ) -> Result<(PhaseTiming, Table)> {
        let path = path.as_ref();
        prepare_input(path, self.runtime);

        let mut clock = PhaseClock::start();
        let table = read_phases(&mut clock, path, format, self.runtime, &self.tracker)?;
        let timing = clock.finish();
        debug!(
            "read {:?}: {} rows in {} batches, {:?}",
            path,
            table.num_rows(),
            table.num_batches(),
            timing
        );
        Ok((timing, table))
    }
}

/// Open and fully read a file with a one-off reader
pub fn open_and_read(
    path: impl AsRef<Path>,
    format: FileFormat,
    runtime: &ColumnarRuntime,
) -> Result<(PhaseTiming, Table)> {
    PhasedReader::new(runtime).open_and_read(path, format)
}
