use crate::notes::{store_error, NoteWriter};
use crate::progress::ProgressReporter;
use crate::queue::QueueSink;
use crate::{Collaborators, IngestState};
use futures::StreamExt;
use std::path::Path;
use tgsync_types::{
    FileDescriptor, FileKind, InboundMessage, IngestError, IngestionResult, TransportError,
};
use tgsync_vault::naming::{join, sanitize_file_name};
use tgsync_vault::PathAllocator;
use tracing::{error, info, warn};

/// Extensions for MIME types where the registry's first pick is a poor file name
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/mp4", "m4a"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("application/pdf", "pdf"),
    ("application/x-tgsticker", "tgs"),
];

/// Stores message attachments in the vault and composes the matching note
pub struct FileIngestor {
    collab: Collaborators,
    allocator: PathAllocator,
    notes: NoteWriter,
    queue: QueueSink,
    progress: ProgressReporter,
}

impl FileIngestor {
    pub fn new(collab: Collaborators, state: &IngestState) -> Self {
        let allocator = state.allocator(collab.vault.clone());
        let notes = NoteWriter::new(
            collab.vault.clone(),
            allocator.clone(),
            collab.settings.notes_location(),
        );
        let progress = ProgressReporter::new(collab.surface.clone());
        Self {
            collab,
            allocator,
            notes,
            queue: state.queue.clone(),
            progress,
        }
    }

    /// Ingest the attachment of `message`. Never fails: errors are folded into
    /// the result, and the message is finalized before returning.
    pub async fn ingest(&self, message: &InboundMessage) -> IngestionResult {
        let mut display_name = None;
        let result = match self.store_attachment(message, &mut display_name).await {
            Ok(path) => {
                let name = display_name.unwrap_or_default();
                info!(
                    chat_id = message.chat_id,
                    message_id = message.id,
                    path = %path,
                    "Attachment stored"
                );
                IngestionResult::stored(path, name)
            }
            Err(e) => {
                error!(
                    chat_id = message.chat_id,
                    message_id = message.id,
                    "Failed to handle attachment: {}",
                    e
                );
                IngestionResult::failed(e, display_name)
            }
        };

        let error = self.compose(message, &result).await;
        self.finalize(message, error.as_ref()).await;
        result
    }

    async fn store_attachment(
        &self,
        message: &InboundMessage,
        display_name: &mut Option<String>,
    ) -> Result<String, IngestError> {
        let base = self.collab.settings.files_location();
        if !base.is_empty() {
            self.collab
                .vault
                .ensure_folder(base)
                .await
                .map_err(store_error)?;
        }

        let (kind, file) = message
            .attachment
            .as_ref()
            .and_then(|attachment| attachment.descriptor())
            .ok_or(IngestError::NoAttachment)?;

        let (bytes, transport_name) = match self.download_streaming(message, kind, file).await {
            Ok(downloaded) => downloaded,
            Err(TransportError::TooLarge) => {
                info!(
                    message_id = message.id,
                    size = file.size_bytes,
                    "File too large for the primary transport, using fallback"
                );
                let bytes = self
                    .collab
                    .fallback
                    .fetch_all(&file.remote_handle, file.size_bytes)
                    .await?;
                let name = format!("{}_{}", kind, sanitize_file_name(&file.unique_id));
                (bytes, name)
            }
            Err(e) => return Err(e.into()),
        };

        let name = message
            .document_file_name()
            .map(str::to_string)
            .unwrap_or(transport_name);
        let (stem, extension) = split_file_name(&name, file.mime_type.as_deref());
        *display_name = Some(name);

        let folder = join(base, &format!("{}s", kind));
        self.collab
            .vault
            .ensure_folder(&folder)
            .await
            .map_err(store_error)?;
        let path = self
            .allocator
            .allocate(&folder, &stem, message.date, &extension)
            .await
            .map_err(store_error)?;
        self.collab
            .vault
            .create_binary(&path, &bytes)
            .await
            .map_err(store_error)?;
        Ok(path)
    }

    /// Primary path: resolve the link, then consume the stream chunk by chunk
    /// while driving the progress indicator. Returns the bytes and the name
    /// derived from the link.
    async fn download_streaming(
        &self,
        message: &InboundMessage,
        kind: FileKind,
        file: &FileDescriptor,
    ) -> Result<(Vec<u8>, String), TransportError> {
        let link = self.collab.transport.resolve_link(&file.remote_handle).await?;
        let name = name_from_link(&link, kind);
        let mut stream = self.collab.transport.open_stream(&file.remote_handle).await?;

        let handle = self.progress.start(message.chat_id, message.id).await;
        let total = file.size_bytes;
        let mut received: u64 = 0;
        let mut stage = 0;
        let mut bytes = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.progress.stop(handle).await;
                    return Err(e);
                }
            };
            received += chunk.len() as u64;
            bytes.extend_from_slice(&chunk);
            stage = self
                .progress
                .update(handle.as_ref(), total, received, stage)
                .await;
        }

        self.progress.stop(handle).await;
        Ok((bytes, name))
    }

    /// Render and place the note for an ingested attachment. Returns the
    /// error the message should be finalized with.
    async fn compose(
        &self,
        message: &InboundMessage,
        result: &IngestionResult,
    ) -> Option<IngestError> {
        let settings = &self.collab.settings;
        let batched = settings.append_all_to_telegram_md;
        let template = settings.template_path();

        // only the file itself is wanted
        if !batched && template.is_none() {
            return result.error.clone();
        }

        let content = match self
            .collab
            .renderer
            .render(template, message, Some(&result.content_ref))
            .await
        {
            Ok(content) => content,
            Err(e) => {
                error!(message_id = message.id, "Failed to render note: {}", e);
                return result.error.clone().or(Some(e));
            }
        };

        if batched {
            self.queue
                .enqueue(message, content, result.error.as_ref())
                .await;
            return result.error.clone();
        }

        let title_source = message
            .caption
            .as_deref()
            .filter(|caption| !caption.is_empty())
            .or(result.display_name.as_deref().filter(|name| !name.is_empty()));
        if let Some(title_source) = title_source {
            if let Err(e) = self.notes.write(message, title_source, &content).await {
                error!(message_id = message.id, "Failed to write companion note: {}", e);
                return result.error.clone().or(Some(e));
            }
        }
        result.error.clone()
    }

    async fn finalize(&self, message: &InboundMessage, error: Option<&IngestError>) {
        if let Err(e) = self.collab.surface.mark_processed(message, error).await {
            warn!(message_id = message.id, "Failed to mark message as processed: {}", e);
        }
    }
}

/// Last segment of a download link with its leading `file` swapped for the
/// kind, e.g. `.../photos/file_12.jpg` becomes `photo_12.jpg`
pub fn name_from_link(link: &str, kind: FileKind) -> String {
    let segment = link.rsplit('/').next().unwrap_or_default();
    segment.replacen("file", kind.as_str(), 1)
}

/// Split a display name into stem and dotted extension. Without an extension
/// in the name, one is derived from the MIME type (or left empty).
pub fn split_file_name(name: &str, mime_type: Option<&str>) -> (String, String) {
    let path = Path::new(name);
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name);
        return (stem.to_string(), format!(".{}", ext));
    }
    let extension = mime_type
        .and_then(extension_for_mime)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    (name.to_string(), extension)
}

pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type.split(';').next()?.trim().to_ascii_lowercase();
    PREFERRED_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(&essence)
                .and_then(|extensions| extensions.first().copied())
        })
}
