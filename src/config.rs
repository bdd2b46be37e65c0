//! Runtime configuration, file formats and compression codecs

use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

use arrow::ipc::CompressionType;
use parquet::basic::{Compression, ZstdLevel};

/// Default number of rows per decoded record batch
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Default iteration count for repeated-read benchmarks
pub const DEFAULT_ITERATIONS: usize = 10;

/// Explicit configuration handed to every reader, writer and driver.
///
/// Nothing here is read from or written to the process environment, so
/// several runs with different settings can coexist in one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Requested number of decode/encode worker threads
    pub worker_threads: NonZeroUsize,
    /// Rows per record batch when decoding Parquet
    pub batch_size: usize,
    /// Drop the input file from the OS page cache before each open phase
    pub evict_page_cache: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: NonZeroUsize::MIN,
            batch_size: DEFAULT_BATCH_SIZE,
            evict_page_cache: false,
        }
    }
}

impl RuntimeConfig {
    pub fn with_worker_threads(mut self, threads: NonZeroUsize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_evict_page_cache(mut self, evict: bool) -> Self {
        self.evict_page_cache = evict;
        self
    }
}

/// On-disk columnar file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// Row-group compressed table format
    Parquet,
    /// Arrow IPC record-batch file format
    Ipc,
}

impl FileFormat {
    /// Guess the format from a path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(FileFormat::Parquet),
            "arrow" | "ipc" | "feather" | "arrows" => Some(FileFormat::Ipc),
            _ => None,
        }
    }

    /// The format a conversion from `self` produces
    pub fn counterpart(&self) -> Self {
        match self {
            FileFormat::Parquet => FileFormat::Ipc,
            FileFormat::Ipc => FileFormat::Parquet,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Parquet => f.write_str("parquet"),
            FileFormat::Ipc => f.write_str("ipc"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            "ipc" | "arrow" | "feather" => Ok(FileFormat::Ipc),
            other => Err(format!("unknown file format '{}'", other)),
        }
    }
}

/// Compression codec applied uniformly to every column of a written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    None,
    Lz4,
    #[default]
    Zstd,
}

impl Codec {
    /// IPC buffer compression; `None` means uncompressed buffers
    pub fn ipc_compression(&self) -> Option<CompressionType> {
        match self {
            Codec::None => None,
            Codec::Lz4 => Some(CompressionType::LZ4_FRAME),
            Codec::Zstd => Some(CompressionType::ZSTD),
        }
    }

    pub fn parquet_compression(&self) -> Compression {
        match self {
            Codec::None => Compression::UNCOMPRESSED,
            Codec::Lz4 => Compression::LZ4_RAW,
            Codec::Zstd => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::None => f.write_str("none"),
            Codec::Lz4 => f.write_str("lz4"),
            Codec::Zstd => f.write_str("zstd"),
        }
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Codec::None),
            "lz4" | "lz4_frame" => Ok(Codec::Lz4),
            "zstd" => Ok(Codec::Zstd),
            other => Err(format!("unknown codec '{}' (expected none, lz4 or zstd)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path("data/t.parquet"), Some(FileFormat::Parquet));
        assert_eq!(FileFormat::from_path("T.PQ"), Some(FileFormat::Parquet));
        assert_eq!(FileFormat::from_path("out.arrow"), Some(FileFormat::Ipc));
        assert_eq!(FileFormat::from_path("out.feather"), Some(FileFormat::Ipc));
        assert_eq!(FileFormat::from_path("notes.txt"), None);
        assert_eq!(FileFormat::from_path("no_extension"), None);
    }

    #[test]
    fn test_codec_parsing() {
        assert_eq!("zstd".parse::<Codec>().unwrap(), Codec::Zstd);
        assert_eq!("LZ4".parse::<Codec>().unwrap(), Codec::Lz4);
        assert_eq!("uncompressed".parse::<Codec>().unwrap(), Codec::None);
        assert!("brotli".parse::<Codec>().is_err());
        assert_eq!(Codec::default(), Codec::Zstd);
    }

    #[test]
    fn test_codec_mapping() {
        assert_eq!(Codec::None.ipc_compression(), None);
        assert_eq!(Codec::Zstd.ipc_compression(), Some(CompressionType::ZSTD));
        assert_eq!(Codec::Lz4.parquet_compression(), Compression::LZ4_RAW);
    }

    #[test]
    fn test_default_config_is_single_threaded() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_threads.get(), 1);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!config.evict_page_cache);
        assert_eq!(config.with_batch_size(0).batch_size, 1);
    }
}
