use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message ID type (Telegram message ID, unique per chat)
pub type MessageId = i32;

/// Chat ID type (Telegram chat ID)
pub type ChatId = i64;

/// One received message, immutable for the duration of an ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    /// Sender username without the leading `@`
    pub sender: Option<String>,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub attachment: Option<Attachment>,
}

impl InboundMessage {
    pub fn new(id: MessageId, chat_id: ChatId, sender: Option<String>, date: DateTime<Utc>) -> Self {
        Self {
            id,
            chat_id,
            sender,
            date,
            text: None,
            caption: None,
            attachment: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Explicit, non-empty file name sent with a document
    pub fn document_file_name(&self) -> Option<&str> {
        match &self.attachment {
            Some(Attachment::Document(file)) => {
                file.display_name.as_deref().filter(|name| !name.is_empty())
            }
            _ => None,
        }
    }
}

/// Kind of media carried by a message; also names the per-kind vault folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Photo,
    Document,
    Audio,
    Voice,
    Video,
    VideoNote,
    Sticker,
    Animation,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::VideoNote => "video_note",
            Self::Sticker => "sticker",
            Self::Animation => "animation",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote file as described by the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub remote_handle: String,
    pub unique_id: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub display_name: Option<String>,
}

impl FileDescriptor {
    pub fn new(remote_handle: impl Into<String>, unique_id: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            remote_handle: remote_handle.into(),
            unique_id: unique_id.into(),
            size_bytes,
            mime_type: None,
            display_name: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// The single attachment a message may carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attachment {
    /// Resolution variants, ordered from smallest to largest
    Photo(Vec<FileDescriptor>),
    Document(FileDescriptor),
    Audio(FileDescriptor),
    Voice(FileDescriptor),
    Video(FileDescriptor),
    VideoNote(FileDescriptor),
    Sticker(FileDescriptor),
    Animation(FileDescriptor),
}

impl Attachment {
    pub fn kind(&self) -> FileKind {
        match self {
            Self::Photo(_) => FileKind::Photo,
            Self::Document(_) => FileKind::Document,
            Self::Audio(_) => FileKind::Audio,
            Self::Voice(_) => FileKind::Voice,
            Self::Video(_) => FileKind::Video,
            Self::VideoNote(_) => FileKind::VideoNote,
            Self::Sticker(_) => FileKind::Sticker,
            Self::Animation(_) => FileKind::Animation,
        }
    }

    /// The file to download; for photos the last (highest fidelity) variant.
    /// Returns `None` for a photo without variants.
    pub fn descriptor(&self) -> Option<(FileKind, &FileDescriptor)> {
        let file = match self {
            Self::Photo(sizes) => sizes.last()?,
            Self::Document(file)
            | Self::Audio(file)
            | Self::Voice(file)
            | Self::Video(file)
            | Self::VideoNote(file)
            | Self::Sticker(file)
            | Self::Animation(file) => file,
        };
        Some((self.kind(), file))
    }
}
