use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HwrError {
    // Storage errors
    #[error("storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("storage path error: {0}")]
    StoragePath(#[from] object_store::path::Error),

    // Serialization errors
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode serialization error: {0}")]
    Bincode(String),

    // Archive errors
    #[error("unsafe archive member path: {path}")]
    UnsafeArchiveMember { path: String },

    #[error("unsupported archive member type {kind} for {path}")]
    UnsupportedArchiveMember { path: String, kind: String },

    #[error("archive error: {0}")]
    Archive(String),

    // Dataset errors
    #[error("no dataset source configured")]
    NoDatasetSource,

    #[error("dataset load timed out after {seconds}s")]
    LoadTimeout { seconds: u64 },

    #[error("dataset load failed: {0}")]
    DatasetLoadFailed(Arc<HwrError>),

    #[error("dataset consistency error: {0}")]
    Consistency(String),

    // Index errors
    #[error("index error: {0}")]
    Index(String),

    // Query errors
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid parameter 'v': dataset version is {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    // Config errors
    #[error("config error: {0}")]
    Config(String),

    // IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // Internal
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Box<bincode::ErrorKind>> for HwrError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        HwrError::Bincode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HwrError>;

impl HwrError {
    pub fn status_code(&self) -> u16 {
        match self {
            HwrError::InvalidQuery(_) | HwrError::DimensionMismatch { .. } => 400,

            HwrError::VersionMismatch { .. } => 404,

            HwrError::NoDatasetSource
            | HwrError::LoadTimeout { .. }
            | HwrError::DatasetLoadFailed(_) => 503,

            _ => 500,
        }
    }

    /// Errors that mean the dataset cannot be trusted for the rest of the
    /// process lifetime, as opposed to a single bad request.
    pub fn is_fatal(&self) -> bool {
        match self {
            HwrError::InvalidQuery(_)
            | HwrError::DimensionMismatch { .. }
            | HwrError::VersionMismatch { .. } => false,
            HwrError::DatasetLoadFailed(_)
            | HwrError::LoadTimeout { .. }
            | HwrError::NoDatasetSource
            | HwrError::Consistency(_)
            | HwrError::UnsafeArchiveMember { .. }
            | HwrError::UnsupportedArchiveMember { .. } => true,
            _ => false,
        }
    }
}
