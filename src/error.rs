use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CastorError {
    #[error("{key} found {count} times, aborting")]
    DuplicateField {
        key: String,
        count: usize,
    },

    #[error("Malformed value for {key}: expected an integer, found {value:?}")]
    MalformedField {
        key: String,
        value: String,
    },

    #[error("{0}, a mandatory field, is missing from CASToR data header")]
    MissingMandatoryField(String),

    #[error("{0} is already enabled, file already contains this correction")]
    AlreadyCorrected(String),

    #[error("Only list-mode data is supported, found data mode {0:?}")]
    UnsupportedDataMode(String),

    #[error("Only a maximum number of lines per event of 1 is supported, found {0}")]
    UnsupportedLinesPerEvent(i64),

    #[error("Truncated record at offset {offset}: need {expected} bytes, got {actual}")]
    TruncatedRecord {
        offset: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Record has no value for schema field {field}")]
    SchemaMismatch { field: &'static str },

    #[error("Data file length {len} is not a multiple of the record size {record_size}")]
    RecordWidthMismatch {
        len: u64,
        record_size: usize,
    },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid file handling")]
    IOError(#[from] std::io::Error),

    #[error("Invalid CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lookup table error: {0}")]
    LookupTable(String),
}

impl CastorError {
    /// Wraps an I/O error raised on `path`, turning `NotFound` into
    /// [`CastorError::FileNotFound`] so callers can report the missing path.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            CastorError::FileNotFound { path: path.into() }
        } else {
            CastorError::IOError(err)
        }
    }

    pub fn is_file_not_found(&self) -> bool {
        matches!(self, CastorError::FileNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CastorError>;
