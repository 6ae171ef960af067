//! Error kinds shared by the stores, the statistics layer and the widget sync.
//!
//! Storage and validation errors are surfaced to callers. External sync errors are produced by
//! [crate::sync::ExternalCounter] implementations and are swallowed by the reconciler.

use thiserror::Error;

/// Failure of the persisted key/value backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode value for {key}: {source}")]
    Json {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A settings field failed its domain check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

/// The companion counter could not be read or written.
#[derive(Error, Debug)]
pub enum ExternalSyncError {
    #[error("shared counter io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shared counter holds malformed data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("count must not be negative, got {0}")]
    InvalidCount(i64),

    #[error("count {0} is larger than the largest storable count {max}", max = u32::MAX)]
    CountTooLarge(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
