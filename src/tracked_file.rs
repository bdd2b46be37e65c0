//! File handles that feed an [`IoStatsTracker`]
//!
//! [`TrackedFile`] serves both readers: the IPC reader drives it through
//! `Read + Seek`, the Parquet reader through `ChunkReader`. Every cursor
//! reads with `pread`, so cursors handed out by `get_read` never disturb
//! each other.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parquet::errors::{ParquetError, Result as ParquetResult};
use parquet::file::reader::{ChunkReader, Length};

use crate::file_manager::{file_size_fd, pread_fd};
use crate::io_stats::IoStatsTracker;

/// Buffer size for the write side
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Read-only file cursor that counts the bytes it pulls from disk
#[derive(Debug)]
pub struct TrackedFile {
    file: Arc<File>,
    file_size: u64,
    position: u64,
    tracker: IoStatsTracker,
}

impl TrackedFile {
    pub fn open(path: impl AsRef<Path>, tracker: IoStatsTracker) -> io::Result<Self> {
        let file = File::open(path)?;
        let file_size = file_size_fd(file.as_raw_fd())?;
        Ok(Self {
            file: Arc::new(file),
            file_size,
            position: 0,
            tracker,
        })
    }

    /// Another cursor over the same descriptor
    fn cursor_at(&self, position: u64) -> Self {
        Self {
            file: Arc::clone(&self.file),
            file_size: self.file_size,
            position,
            tracker: self.tracker.clone(),
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Read for TrackedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.file_size {
            return Ok(0);
        }
        let n = pread_fd(self.file.as_raw_fd(), buf, self.position)?;
        self.position += n as u64;
        self.tracker.record_read(n as u64);
        Ok(n)
    }
}

impl Seek for TrackedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.file_size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(target) => {
                self.position = target;
                Ok(target)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl Length for TrackedFile {
    fn len(&self) -> u64 {
        self.file_size
    }
}

impl ChunkReader for TrackedFile {
    type T = TrackedFile;

    fn get_read(&self, start: u64) -> ParquetResult<Self::T> {
        Ok(self.cursor_at(start))
    }

    fn get_bytes(&self, start: u64, length: usize) -> ParquetResult<Bytes> {
        let mut reader = self.cursor_at(start);
        let mut buffer = vec![0u8; length];
        reader.read_exact(&mut buffer).map_err(|e| {
            ParquetError::General(format!(
                "failed to read {} bytes at offset {}: {}",
                length, start, e
            ))
        })?;
        Ok(Bytes::from(buffer))
    }
}

/// Buffered writer that counts the bytes handed to it
pub struct TrackedWriter {
    inner: BufWriter<File>,
    tracker: IoStatsTracker,
}

impl TrackedWriter {
    pub fn create(path: impl AsRef<Path>, tracker: IoStatsTracker) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
            tracker,
        })
    }

    /// Flush buffered bytes and hand back the file
    pub fn into_file(self) -> io::Result<File> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

impl Write for TrackedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.tracker.record_write(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
