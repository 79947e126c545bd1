//! tgsync Types - Core types shared by the ingestion pipeline
//!
//! This module defines the message, attachment and outcome types that flow
//! from the Telegram adapter through the router into the vault.

mod error;
mod message;

pub use error::{IngestError, TransportError};
pub use message::{Attachment, ChatId, FileDescriptor, FileKind, InboundMessage, MessageId};

use serde::{Deserialize, Serialize};

/// Marker embedded in note content when an attachment could not be stored
pub const FILE_ERROR_MARKER: &str = "❌ error while handling file";

/// Outcome of handing one message to the file ingestor
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionResult {
    /// Link to the stored file, or the bracketed error marker
    pub content_ref: String,
    /// Vault path of the stored binary; `None` when nothing was written
    pub stored_path: Option<String>,
    /// Display name resolved for the attachment, if any
    pub display_name: Option<String>,
    pub error: Option<IngestError>,
}

impl IngestionResult {
    pub fn stored(path: String, display_name: String) -> Self {
        Self {
            content_ref: embed_link(&display_name, &path),
            stored_path: Some(path),
            display_name: Some(display_name),
            error: None,
        }
    }

    pub fn failed(error: IngestError, display_name: Option<String>) -> Self {
        Self {
            content_ref: format!("[{}]({})", FILE_ERROR_MARKER, error),
            stored_path: None,
            display_name,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Markdown embed for a stored file; whitespace in the path is percent-encoded
pub fn embed_link(display_name: &str, path: &str) -> String {
    let encoded: String = path
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                "%20".to_string()
            } else {
                c.to_string()
            }
        })
        .collect();
    format!("![{}]({})", display_name, encoded)
}

/// A rendered message waiting for the batched-append drain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEntry {
    pub message: InboundMessage,
    pub content: String,
    pub error: Option<String>,
}
