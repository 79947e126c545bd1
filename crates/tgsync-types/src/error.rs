use thiserror::Error;

/// Failures that can end the ingestion of a single message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Sender is missing or not on the allow-list
    #[error("sender '{handle}' is not allowed")]
    AuthorizationDenied { handle: String },

    /// File handling was invoked on a message without a recognized attachment
    #[error("Can't get file object from the message!")]
    NoAttachment,

    /// Primary transport refused the file and no fallback recovered it
    #[error("file is too big for the transport")]
    TransportTooLarge,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("store write failed: {0}")]
    StoreWrite(String),

    #[error("template error: {0}")]
    Template(String),
}

/// Errors returned by file transports
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport refuses files above its size ceiling
    #[error("file is too big")]
    TooLarge,

    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for IngestError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TooLarge => IngestError::TransportTooLarge,
            TransportError::Other(reason) => IngestError::Transport(reason),
        }
    }
}
