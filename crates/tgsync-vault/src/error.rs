use thiserror::Error;

/// Vault operation errors
#[derive(Debug, Error)]
pub enum VaultError {
    /// Create-only write hit an existing file
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("file not found: {0}")]
    NotFound(String),

    /// Path escapes the vault root or is otherwise unusable
    #[error("invalid vault path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("vault is read-only")]
    ReadOnly,

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, VaultError>;
