//! Format conversion pipeline: phased read followed by phased write

use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use log::{debug, info};

use crate::config::{Codec, FileFormat};
use crate::error::{BenchError, Result};
use crate::io_stats::IoStatsTracker;
use crate::reader::{open_and_read, prepare_input, read_phases, same_columns};
use crate::runtime::ColumnarRuntime;
use crate::timing::{PhaseClock, PhaseTiming};
use crate::writer::write_phase;

/// What a successful conversion produced
#[derive(Debug, Clone)]
pub struct Conversion {
    pub timing: PhaseTiming,
    pub rows: usize,
    pub schema: SchemaRef,
}

/// Converts one file from its format to another
#[derive(Debug, Clone)]
pub struct ConversionPipeline<'a> {
    runtime: &'a ColumnarRuntime,
    input: PathBuf,
    input_format: FileFormat,
    output: PathBuf,
    output_format: FileFormat,
    codec: Codec,
    tracker: IoStatsTracker,
}

impl<'a> ConversionPipeline<'a> {
    /// Parquet to Arrow IPC, the reference direction
    pub fn new(
        runtime: &'a ColumnarRuntime,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        codec: Codec,
    ) -> Self {
        Self {
            runtime,
            input: input.as_ref().to_path_buf(),
            input_format: FileFormat::Parquet,
            output: output.as_ref().to_path_buf(),
            output_format: FileFormat::Ipc,
            codec,
            tracker: IoStatsTracker::new(),
        }
    }

    pub fn with_formats(mut self, input_format: FileFormat, output_format: FileFormat) -> Self {
        self.input_format = input_format;
        self.output_format = output_format;
        self
    }

    pub fn with_tracker(mut self, tracker: IoStatsTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &IoStatsTracker {
        &self.tracker
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run open, read and write back to back.
    ///
    /// `total` is stamped after the output file is in place, so it also
    /// covers the gaps between phases. The write is never attempted when
    /// the read fails.
    pub fn convert(&self) -> Result<Conversion> {
        prepare_input(&self.input, self.runtime);

        let mut clock = PhaseClock::start();
        let table = read_phases(
            &mut clock,
            &self.input,
            self.input_format,
            self.runtime,
            &self.tracker,
        )?;
        write_phase(
            &mut clock,
            &table,
            &self.output,
            self.output_format,
            self.codec,
            &self.tracker,
        )?;
        let timing = clock.finish();

        info!(
            "converted {:?} ({}) to {:?} ({}, {}): {} rows",
            self.input,
            self.input_format,
            self.output,
            self.output_format,
            self.codec,
            table.num_rows()
        );
        Ok(Conversion {
            timing,
            rows: table.num_rows(),
            schema: table.schema().clone(),
        })
    }

    /// Re-open the output and check it holds the same row count and
    /// columns as the conversion read. Not timed.
    pub fn verify(&self, conversion: &Conversion) -> Result<()> {
        let (_, table) = open_and_read(&self.output, self.output_format, self.runtime)?;
        if table.num_rows() != conversion.rows {
            return Err(BenchError::decode(
                &self.output,
                format!(
                    "row count mismatch: wrote {}, read back {}",
                    conversion.rows,
                    table.num_rows()
                ),
            ));
        }
        if !same_columns(&conversion.schema, table.schema()) {
            return Err(BenchError::decode(
                &self.output,
                format!(
                    "schema mismatch: wrote {:?}, read back {:?}",
                    conversion.schema.fields(),
                    table.schema().fields()
                ),
            ));
        }
        debug!("verified {:?}: {} rows", self.output, table.num_rows());
        Ok(())
    }
}

/// Convert `input` (Parquet) into `output` (Arrow IPC) with `codec`
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    codec: Codec,
    runtime: &ColumnarRuntime,
) -> Result<PhaseTiming> {
    ConversionPipeline::new(runtime, input, output, codec)
        .convert()
        .map(|c| c.timing)
}
