//! Errors raised at the ingestion boundary

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a workbook file into a dataset.
///
/// Only total inability to read the source is an error; malformed cells and
/// missing sheets are absorbed by the parsers.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("workbook not found: {0}")]
    NotFound(PathBuf),

    /// I/O failure while reading the file, including a lock held by another process
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to decode sheet '{sheet}' in {path}: {source}")]
    Sheet {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl IngestError {
    /// Whether a later attempt on the same file may succeed; a missing file
    /// may reappear after a save by rename
    pub fn is_retryable(&self) -> bool {
        !matches!(self, IngestError::UnsupportedFormat(_))
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
