//! Phased file writer
//!
//! The table is encoded into a hidden sibling of the target and renamed
//! onto it only after the writer session has been finalized. A failed
//! write removes the temporary file and never touches the target.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arrow::ipc::writer::{FileWriter, IpcWriteOptions};
use log::{debug, warn};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::config::{Codec, FileFormat};
use crate::error::{BenchError, Phase, Result};
use crate::io_stats::IoStatsTracker;
use crate::reader::Table;
use crate::timing::PhaseClock;
use crate::tracked_file::TrackedWriter;

/// Distinguishes temp files of concurrent writes within one process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Hidden temporary path next to `target`, unique per call
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.tmp-{}-{}", name, std::process::id(), seq);
    match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// Encode every batch of `table` into `dest` as one writer session,
/// closed before returning
fn encode(
    table: &Table,
    dest: &Path,
    target: &Path,
    format: FileFormat,
    codec: Codec,
    tracker: &IoStatsTracker,
) -> Result<()> {
    let fail = |e: &dyn std::fmt::Display| BenchError::encode(target, e);
    let sink = TrackedWriter::create(dest, tracker.clone()).map_err(|e| fail(&e))?;

    let sink = match format {
        FileFormat::Ipc => {
            let options = IpcWriteOptions::default()
                .try_with_compression(codec.ipc_compression())
                .map_err(|e| fail(&e))?;
            let mut writer = FileWriter::try_new_with_options(sink, table.schema(), options)
                .map_err(|e| fail(&e))?;
            for batch in table.batches() {
                writer.write(batch).map_err(|e| fail(&e))?;
            }
            writer.finish().map_err(|e| fail(&e))?;
            writer.into_inner().map_err(|e| fail(&e))?
        }
        FileFormat::Parquet => {
            let props = WriterProperties::builder()
                .set_compression(codec.parquet_compression())
                .build();
            let mut writer = ArrowWriter::try_new(sink, table.schema().clone(), Some(props))
                .map_err(|e| fail(&e))?;
            for batch in table.batches() {
                writer.write(batch).map_err(|e| fail(&e))?;
            }
            writer.into_inner().map_err(|e| fail(&e))?
        }
    };

    sink.into_file().map_err(|e| fail(&e))?;
    Ok(())
}

/// Run the write phase on an already started clock and publish the file
pub(crate) fn write_phase(
    clock: &mut PhaseClock,
    table: &Table,
    target: &Path,
    format: FileFormat,
    codec: Codec,
    tracker: &IoStatsTracker,
) -> Result<()> {
    let temp = temp_path_for(target);
    let written = clock.measure(Phase::Write, || {
        encode(table, &temp, target, format, codec, tracker)
    });

    let published = written.and_then(|()| {
        fs::rename(&temp, target).map_err(|e| BenchError::encode(target, e))
    });

    if published.is_err() {
        if let Err(e) = fs::remove_file(&temp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove temporary file {:?}: {}", temp, e);
            }
        }
    }
    published
}

/// Writes in-memory tables to a columnar format, timing the write phase
#[derive(Debug, Clone, Default)]
pub struct PhasedWriter {
    tracker: IoStatsTracker,
}

impl PhasedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracker(mut self, tracker: IoStatsTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &IoStatsTracker {
        &self.tracker
    }

    /// Encode `table` into `path` with `codec` applied to every column.
    ///
    /// Returns the write-phase duration, which covers finalization of the
    /// file but not the rename that publishes it.
    pub fn write(
        &self,
        table: &Table,
        path: impl AsRef<Path>,
        format: FileFormat,
        codec: Codec,
    ) -> Result<Duration> {
        let path = path.as_ref();
        let mut clock = PhaseClock::start();
        write_phase(&mut clock, table, path, format, codec, &self.tracker)?;
        let timing = clock.finish();
        let elapsed = timing.write.unwrap_or_default();
        debug!(
            "wrote {} rows to {:?} as {} ({}) in {:?}",
            table.num_rows(),
            path,
            format,
            codec,
            elapsed
        );
        Ok(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::reader::open_and_read;
    use crate::runtime::ColumnarRuntime;
    use crate::test_support::sample_table;
    use tempfile::TempDir;

    #[test]
    fn test_write_ipc_with_each_codec() {
        let dir = TempDir::new().unwrap();
        let runtime = ColumnarRuntime::new(RuntimeConfig::default());
        let table = sample_table(1000, 250);

        for codec in [Codec::None, Codec::Lz4, Codec::Zstd] {
            let path = dir.path().join(format!("out_{}.arrow", codec));
            let writer = PhasedWriter::new();
            writer.write(&table, &path, FileFormat::Ipc, codec).unwrap();
            assert!(writer.tracker().snapshot().write_bytes > 0);

            let (_, back) = open_and_read(&path, FileFormat::Ipc, &runtime).unwrap();
            assert_eq!(back.num_rows(), 1000);
            assert_eq!(back.schema().fields().len(), 3);
        }
    }

    #[test]
    fn test_write_parquet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.parquet");
        let table = sample_table(500, 100);

        PhasedWriter::new()
            .write(&table, &path, FileFormat::Parquet, Codec::Zstd)
            .unwrap();

        let runtime = ColumnarRuntime::default();
        let (_, back) = open_and_read(&path, FileFormat::Parquet, &runtime).unwrap();
        assert_eq!(back.num_rows(), 500);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing_dir").join("out.arrow");
        let table = sample_table(10, 10);

        let err = PhasedWriter::new()
            .write(&table, &target, FileFormat::Ipc, Codec::Zstd)
            .unwrap_err();
        assert_eq!(err.phase(), Phase::Write);
        assert!(!target.exists());
    }

    #[test]
    fn test_no_temp_file_survives_success() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("clean.arrow");
        PhasedWriter::new()
            .write(&sample_table(20, 20), &target, FileFormat::Ipc, Codec::Lz4)
            .unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["clean.arrow".to_string()]);
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/data/out.arrow"));
        assert_eq!(temp.parent(), Some(Path::new("/data")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".out.arrow.tmp-"));
    }

    #[test]
    fn test_temp_paths_differ_for_same_target() {
        let target = Path::new("/data/out.arrow");
        let first = temp_path_for(target);
        let second = temp_path_for(target);
        assert_ne!(first, second);
        assert_eq!(first.parent(), second.parent());
    }
}
