use thiserror::Error;

/// Failures of the history store. Empty results are never errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
    #[error("history record {id} is corrupt: {reason}")]
    Corrupt { id: i64, reason: String },
    #[error("history store lock poisoned by a panicked writer")]
    Poisoned,
}

/// Failures of a single ingestion. Resolution and aggregation never fail, so
/// only table parsing and persistence appear here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not parse input as a table: {0}")]
    Input(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    pub(crate) fn input(err: impl std::fmt::Display) -> Self {
        IngestError::Input(err.to_string())
    }
}
