#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Note '{id}' not found for '{url}'")]
    NotFound { url: String, id: String },

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl From<url::ParseError> for NotesError {
    fn from(value: url::ParseError) -> Self {
        Self::Validation(format!("invalid page url: {value}"))
    }
}

pub type NotesResult<T> = Result<T, NotesError>;
