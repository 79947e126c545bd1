use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, MessageId as TgMessageId, ParseMode as TgParseMode,
    ReactionType, ReplyParameters,
};
use tgsync_ingest::{ChatSurface, LinkButton, ParseMode, ReplyOptions};
use tgsync_persistence::PersistenceService;
use tgsync_types::{ChatId as InboundChatId, InboundMessage, IngestError, MessageId};
use tracing::{debug, warn};

const PROCESSED_REACTION: &str = "👍";
const FAILED_REACTION: &str = "👎";

/// [`ChatSurface`] backed by the Bot API.
///
/// Finalizing a message reacts to it and records the outcome in the
/// processed-message log.
pub struct TelegramSurface {
    bot: Bot,
    persistence: Arc<PersistenceService>,
}

impl TelegramSurface {
    pub fn new(bot: Bot, persistence: Arc<PersistenceService>) -> Self {
        Self { bot, persistence }
    }
}

fn keyboard(rows: &[Vec<LinkButton>]) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|button| match reqwest::Url::parse(&button.url) {
                    Ok(url) => Some(InlineKeyboardButton::url(button.text.clone(), url)),
                    Err(e) => {
                        warn!(url = %button.url, error = %e, "Skipping button with invalid URL");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}

#[async_trait]
impl ChatSurface for TelegramSurface {
    async fn reply(
        &self,
        chat_id: InboundChatId,
        text: &str,
        options: ReplyOptions,
    ) -> Result<MessageId> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(reply_to) = options.reply_to {
            request = request.reply_parameters(ReplyParameters::new(TgMessageId(reply_to)));
        }
        if options.parse_mode == ParseMode::Html {
            request = request.parse_mode(TgParseMode::Html);
        }
        if let Some(markup) = keyboard(&options.buttons) {
            request = request.reply_markup(markup);
        }

        let sent = request.await?;
        Ok(sent.id.0)
    }

    async fn edit(&self, chat_id: InboundChatId, message_id: MessageId, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(ChatId(chat_id), TgMessageId(message_id), text)
            .await?;
        Ok(())
    }

    async fn delete(&self, chat_id: InboundChatId, message_id: MessageId) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), TgMessageId(message_id))
            .await?;
        Ok(())
    }

    async fn mark_processed(
        &self,
        message: &InboundMessage,
        error: Option<&IngestError>,
    ) -> Result<()> {
        let emoji = if error.is_some() {
            FAILED_REACTION
        } else {
            PROCESSED_REACTION
        };

        let reaction = self
            .bot
            .set_message_reaction(ChatId(message.chat_id), TgMessageId(message.id))
            .reaction(vec![ReactionType::Emoji {
                emoji: emoji.to_string(),
            }])
            .await;
        if let Err(e) = reaction {
            warn!(message_id = message.id, error = %e, "Failed to react to message");
        }

        let error_text = error.map(ToString::to_string);
        self.persistence
            .record_processed(message.chat_id, message.id, error_text.as_deref())
            .await?;

        debug!(
            chat_id = message.chat_id,
            message_id = message.id,
            failed = error.is_some(),
            "Message finalized"
        );
        Ok(())
    }
}
