//! Error types for Mnemo operations

/// Result type for Mnemo operations
pub type Result<T> = std::result::Result<T, MnemoError>;

/// Error types for the memory engine
#[derive(Debug, thiserror::Error)]
pub enum MnemoError {
    /// Malformed record rejected at construction
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisting the store or eviction index failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MnemoError {
    /// Shorthand for a validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        MnemoError::Validation(msg.into())
    }

    /// Whether this error came from record validation
    pub fn is_validation(&self) -> bool {
        matches!(self, MnemoError::Validation(_))
    }
}

impl From<tempfile::PersistError> for MnemoError {
    fn from(err: tempfile::PersistError) -> Self {
        MnemoError::Storage(format!("atomic rename failed: {}", err.error))
    }
}
