use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// A value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value exists but does not match the expected shape.
    #[error("Corrupt value for key '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// The store cannot be reached at the moment.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl StoreError {
    /// Whether a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
