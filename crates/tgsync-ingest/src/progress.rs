//! In-chat download progress indicator
//!
//! The indicator moves through a small number of discrete stages and is only
//! edited when the stage advances, which bounds the number of edits per
//! download regardless of chunk count.

use crate::surface::{ChatSurface, ReplyOptions};
use std::sync::Arc;
use tgsync_types::{ChatId, MessageId};
use tracing::{debug, warn};

/// Stage bookkeeping for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStages {
    count: u8,
}

impl ProgressStages {
    pub const fn new(count: u8) -> Self {
        Self { count }
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// Stage reached after `received` of `total` bytes
    pub fn threshold(&self, received: u64, total: u64) -> u8 {
        if total == 0 || self.count == 0 {
            return 0;
        }
        let stage = received.saturating_mul(u64::from(self.count)) / total;
        stage.min(u64::from(self.count)) as u8
    }
}

impl Default for ProgressStages {
    fn default() -> Self {
        Self::new(10)
    }
}

/// The indicator message posted in the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressHandle {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Posts, edits and removes the indicator. Chat failures are logged and
/// otherwise ignored; a missing handle turns every call into a no-op.
#[derive(Clone)]
pub struct ProgressReporter {
    surface: Arc<dyn ChatSurface>,
    stages: ProgressStages,
    label: String,
}

impl ProgressReporter {
    pub fn new(surface: Arc<dyn ChatSurface>) -> Self {
        Self {
            surface,
            stages: ProgressStages::default(),
            label: "downloading".to_string(),
        }
    }

    pub async fn start(&self, chat_id: ChatId, reply_to: MessageId) -> Option<ProgressHandle> {
        let text = self.render(0);
        match self
            .surface
            .reply(chat_id, &text, ReplyOptions::reply_to(reply_to))
            .await
        {
            Ok(message_id) => Some(ProgressHandle {
                chat_id,
                message_id,
            }),
            Err(e) => {
                warn!(chat_id, "Failed to post progress indicator: {}", e);
                None
            }
        }
    }

    /// Edit the indicator if `received` crossed into a later stage; returns
    /// the stage now shown.
    pub async fn update(
        &self,
        handle: Option<&ProgressHandle>,
        total: u64,
        received: u64,
        stage: u8,
    ) -> u8 {
        let next = self.stages.threshold(received, total);
        if next <= stage {
            return stage;
        }
        if let Some(handle) = handle {
            debug!(
                chat_id = handle.chat_id,
                received, total, stage = next, "Progress stage advanced"
            );
            if let Err(e) = self
                .surface
                .edit(handle.chat_id, handle.message_id, &self.render(next))
                .await
            {
                warn!(chat_id = handle.chat_id, "Failed to update progress indicator: {}", e);
            }
        }
        next
    }

    pub async fn stop(&self, handle: Option<ProgressHandle>) {
        let Some(handle) = handle else {
            return;
        };
        if let Err(e) = self.surface.delete(handle.chat_id, handle.message_id).await {
            warn!(chat_id = handle.chat_id, "Failed to remove progress indicator: {}", e);
        }
    }

    /// `downloading [■■■□□□□□□□] 30%`
    pub fn render(&self, stage: u8) -> String {
        let count = self.stages.count().max(1);
        let done = stage.min(count);
        let bar: String = "■".repeat(usize::from(done)) + &"□".repeat(usize::from(count - done));
        let percent = u32::from(done) * 100 / u32::from(count);
        format!("{} [{}] {}%", self.label, bar, percent)
    }
}
