//! Error taxonomy for benchmark iterations

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Phase of an I/O operation whose duration is measured on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Open,
    Read,
    Write,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Open => "open",
            Phase::Read => "read",
            Phase::Write => "write",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single iteration. Any of these short-circuits the remaining
/// phases of the iteration it occurred in.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BenchError {
    /// File missing, unreadable, or its metadata could not be parsed
    #[error("failed to open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Row data or schema could not be decoded
    #[error("failed to read {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Codec, disk or permission failure on the write side
    #[error("failed to write {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
}

impl BenchError {
    pub fn open(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        BenchError::Open {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        BenchError::Decode {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        BenchError::Encode {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// The phase that raised this failure
    pub fn phase(&self) -> Phase {
        match self {
            BenchError::Open { .. } => Phase::Open,
            BenchError::Decode { .. } => Phase::Read,
            BenchError::Encode { .. } => Phase::Write,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            BenchError::Open { path, .. }
            | BenchError::Decode { path, .. }
            | BenchError::Encode { path, .. } => path,
        }
    }
}
