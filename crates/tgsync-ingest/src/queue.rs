use std::sync::Arc;
use tgsync_types::{InboundMessage, IngestError, QueuedEntry};
use tokio::sync::Mutex;
use tracing::debug;

/// Append-only queue of rendered messages for batched-append mode.
///
/// Entries keep arrival order; a separate drain consumes them.
#[derive(Debug, Clone, Default)]
pub struct QueueSink {
    entries: Arc<Mutex<Vec<QueuedEntry>>>,
}

impl QueueSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(
        &self,
        message: &InboundMessage,
        content: String,
        error: Option<&IngestError>,
    ) {
        let mut entries = self.entries.lock().await;
        entries.push(QueuedEntry {
            message: message.clone(),
            content,
            error: error.map(ToString::to_string),
        });
        debug!(
            chat_id = message.chat_id,
            message_id = message.id,
            queued = entries.len(),
            "Message queued for batched append"
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Copy of the queued entries, oldest first
    pub async fn snapshot(&self) -> Vec<QueuedEntry> {
        self.entries.lock().await.clone()
    }

    /// Take every queued entry, oldest first
    pub async fn drain(&self) -> Vec<QueuedEntry> {
        std::mem::take(&mut *self.entries.lock().await)
    }
}
