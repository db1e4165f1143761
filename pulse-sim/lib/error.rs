//! Library-wide error definitions.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    /// An operator or state array does not match the dimension of the system.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// A configuration bundle failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Couldn't touch a save file or its lock file.
    #[error("save file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A save file exists but couldn't be parsed.
    #[error("malformed save file: {0}")]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    /// A save file couldn't be written.
    #[error("error writing save file: {0}")]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),

    /// A save file is missing a required dataset.
    #[error("save file {0:?} is missing dataset '{1}'")]
    MissingDataset(PathBuf, String),

    /// A save file holds no recorded optimization results.
    #[error("save file {0:?} contains no recorded results")]
    EmptySaveFile(PathBuf),
}

pub type PulseResult<T> = Result<T, PulseError>;
