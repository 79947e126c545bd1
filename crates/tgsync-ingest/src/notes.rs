use std::sync::Arc;
use tgsync_types::{InboundMessage, IngestError};
use tgsync_vault::naming::note_title;
use tgsync_vault::{PathAllocator, Vault, VaultError};
use tracing::info;

pub(crate) fn store_error(err: VaultError) -> IngestError {
    IngestError::StoreWrite(err.to_string())
}

/// Writes individual notes under unique paths in the notes folder
#[derive(Clone)]
pub struct NoteWriter {
    vault: Arc<dyn Vault>,
    allocator: PathAllocator,
    folder: String,
}

impl NoteWriter {
    pub fn new(vault: Arc<dyn Vault>, allocator: PathAllocator, folder: impl Into<String>) -> Self {
        Self {
            vault,
            allocator,
            folder: folder.into(),
        }
    }

    /// Write `content` to `{folder}/{title} - {date}{time}.md`, where the title
    /// is the sanitized first 20 characters of `title_source`.
    pub async fn write(
        &self,
        message: &InboundMessage,
        title_source: &str,
        content: &str,
    ) -> Result<String, IngestError> {
        if !self.folder.is_empty() {
            self.vault
                .ensure_folder(&self.folder)
                .await
                .map_err(store_error)?;
        }
        let title = note_title(title_source);
        let path = self
            .allocator
            .allocate(&self.folder, &title, message.date, ".md")
            .await
            .map_err(store_error)?;
        self.vault
            .create_text(&path, content)
            .await
            .map_err(store_error)?;

        info!(
            chat_id = message.chat_id,
            message_id = message.id,
            path = %path,
            "Note created"
        );
        Ok(path)
    }
}
