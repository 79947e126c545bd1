use anyhow::Result;
use async_trait::async_trait;
use tgsync_types::{ChatId, InboundMessage, IngestError, MessageId};

/// How reply text should be parsed by the chat client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

/// A button that opens a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

impl LinkButton {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyOptions {
    pub reply_to: Option<MessageId>,
    pub parse_mode: ParseMode,
    /// Rows of link buttons attached under the message
    pub buttons: Vec<Vec<LinkButton>>,
}

impl ReplyOptions {
    pub fn reply_to(message_id: MessageId) -> Self {
        Self {
            reply_to: Some(message_id),
            ..Default::default()
        }
    }
}

/// The messaging surface: replies, edits, deletes and the finalization hook
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Send a message to `chat_id`, returning the new message's id
    async fn reply(&self, chat_id: ChatId, text: &str, options: ReplyOptions) -> Result<MessageId>;

    async fn edit(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()>;

    async fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    /// Acknowledge that `message` has been handled terminally.
    /// Called exactly once per routed message.
    async fn mark_processed(&self, message: &InboundMessage, error: Option<&IngestError>)
        -> Result<()>;
}
