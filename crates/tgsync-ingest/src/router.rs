use crate::ingestor::FileIngestor;
use crate::notes::{store_error, NoteWriter};
use crate::queue::QueueSink;
use crate::release::ReleaseNotice;
use crate::surface::ReplyOptions;
use crate::{Collaborators, IngestState};
use std::sync::atomic::{AtomicBool, Ordering};
use tgsync_types::{InboundMessage, IngestError};
use tracing::{error, info, warn};

/// Reply sent to senders missing from the allow-list
pub fn access_denied_notice(handle: &str) -> String {
    format!(
        "Access denied. Add your username {} in the setting \"allowed_usernames\".",
        handle
    )
}

/// Entry point of the pipeline: one call per inbound message
pub struct MessageRouter {
    collab: Collaborators,
    ingestor: FileIngestor,
    notes: NoteWriter,
    queue: QueueSink,
    release: Option<ReleaseNotice>,
    release_checked: AtomicBool,
}

impl MessageRouter {
    pub fn new(collab: Collaborators, state: IngestState) -> Self {
        let notes = NoteWriter::new(
            collab.vault.clone(),
            state.allocator(collab.vault.clone()),
            collab.settings.notes_location(),
        );
        Self {
            ingestor: FileIngestor::new(collab.clone(), &state),
            notes,
            queue: state.queue.clone(),
            collab,
            release: None,
            release_checked: AtomicBool::new(false),
        }
    }

    /// Announce new releases in the chat of the first authorized message
    pub fn with_release_notice(mut self, release: ReleaseNotice) -> Self {
        self.release = Some(release);
        self
    }

    /// Whether `sender` may use the bot
    pub fn is_allowed(&self, sender: Option<&str>) -> bool {
        self.collab.settings.is_allowed(sender)
    }

    pub fn ingestor(&self) -> &FileIngestor {
        &self.ingestor
    }

    /// Route one message. Never fails: authorization problems become a chat
    /// reply, everything else ends up in note content or the finalization.
    pub async fn route(&self, message: InboundMessage) {
        let sender = message.sender.as_deref();
        if !self.is_allowed(sender) {
            let handle = sender.unwrap_or_default();
            warn!(
                chat_id = message.chat_id,
                sender = handle,
                "{}",
                IngestError::AuthorizationDenied {
                    handle: handle.to_string()
                }
            );
            let notice = access_denied_notice(handle);
            if let Err(e) = self
                .collab
                .surface
                .reply(message.chat_id, &notice, ReplyOptions::reply_to(message.id))
                .await
            {
                error!(chat_id = message.chat_id, "Failed to send access denial: {}", e);
            }
            return;
        }

        self.check_release_once(&message).await;

        let Some(text) = message.text.as_deref() else {
            self.ingestor.ingest(&message).await;
            return;
        };

        match self.handle_text(&message, text).await {
            Ok(()) => self.finalize(&message, None).await,
            Err(e) => {
                error!(
                    chat_id = message.chat_id,
                    message_id = message.id,
                    "Failed to handle text message: {}",
                    e
                );
                self.finalize(&message, Some(&e)).await;
            }
        }
    }

    async fn handle_text(&self, message: &InboundMessage, text: &str) -> Result<(), IngestError> {
        let settings = &self.collab.settings;
        let location = settings.notes_location();
        if !location.is_empty() {
            self.collab
                .vault
                .ensure_folder(location)
                .await
                .map_err(store_error)?;
        }

        let content = self
            .collab
            .renderer
            .render(settings.template_path(), message, None)
            .await?;

        if settings.append_all_to_telegram_md {
            self.queue.enqueue(message, content, None).await;
            return Ok(());
        }

        self.notes.write(message, text, &content).await?;
        Ok(())
    }

    async fn check_release_once(&self, message: &InboundMessage) {
        let Some(release) = &self.release else {
            return;
        };
        if self.release_checked.swap(true, Ordering::SeqCst) {
            return;
        }
        match release.check(message.chat_id).await {
            Ok(true) => info!(chat_id = message.chat_id, "Announced new release"),
            Ok(false) => {}
            Err(e) => warn!("Release notice check failed: {}", e),
        }
    }

    async fn finalize(&self, message: &InboundMessage, error: Option<&IngestError>) {
        if let Err(e) = self.collab.surface.mark_processed(message, error).await {
            warn!(message_id = message.id, "Failed to mark message as processed: {}", e);
        }
    }
}
