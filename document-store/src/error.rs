use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Transient backend failure; callers may retry explicitly
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document does not exist")]
    MissingDocument,

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
