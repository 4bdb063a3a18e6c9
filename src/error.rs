//! Fatal errors. Anything that only affects one element of the document is a
//! [`NormalizeWarning`](crate::melt::NormalizeWarning) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not valid JSON.
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// Reading the input failed.
    #[error("failed to read input: {0}")]
    Read(#[source] std::io::Error),
    /// An output file could not be created or written.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The output directory is missing or is not a directory.
    #[error("output directory {} does not exist or is not a directory", .0.display())]
    OutputDir(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
