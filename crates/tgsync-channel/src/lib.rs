//! Telegram side of tgsync: the bot dispatcher plus teloxide-backed
//! implementations of the ingestion seams.

mod convert;
mod surface;
mod transport;
mod version_store;

pub use convert::to_inbound;
pub use surface::TelegramSurface;
pub use transport::{BotApiTransport, LocalBotApiTransport};
pub use version_store::SqliteVersionStore;

use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::ReplyParameters,
    utils::command::BotCommands,
};
use tgsync_ingest::{access_denied_notice, MessageRouter};
use tgsync_persistence::PersistenceService;
use tgsync_provider::TextGenerator;
use tracing::{debug, error, info};

/// Maximum message length for Telegram (4096 chars, but we use less to be safe)
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Telegram channel service
pub struct TelegramService {
    bot: Bot,
    router: Arc<MessageRouter>,
    persistence: Arc<PersistenceService>,
    generator: Arc<TextGenerator>,
}

/// Bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Get help")]
    Help,
    #[command(description = "Show how many messages from this chat were saved")]
    Status,
    #[command(description = "Ask the language model: /ask <prompt>")]
    Ask(String),
}

impl TelegramService {
    pub fn new(
        bot: Bot,
        router: MessageRouter,
        persistence: Arc<PersistenceService>,
        generator: TextGenerator,
    ) -> Self {
        info!("Telegram service initialized");
        Self {
            bot,
            router: Arc::new(router),
            persistence,
            generator: Arc::new(generator),
        }
    }

    /// Validate the bot token by making a test API call
    pub async fn validate_token(&self) -> Result<()> {
        info!("Validating Telegram bot token...");

        match self.bot.get_me().await {
            Ok(me) => {
                info!(username = %me.username(), "Telegram bot token is valid");
                Ok(())
            }
            Err(teloxide::RequestError::Api(teloxide::ApiError::InvalidToken)) => Err(anyhow!(
                "Invalid Telegram bot token. Please check TELEGRAM_BOT_TOKEN environment variable \
                or edit ~/.tgsync/tgsync.toml"
            )),
            Err(e) => Err(anyhow!("Failed to validate Telegram bot token: {}", e)),
        }
    }

    /// Run the Telegram service (this is a blocking call)
    pub async fn run(self) -> Result<()> {
        self.validate_token().await?;

        info!("Starting Telegram bot...");

        let router = self.router.clone();
        let persistence = self.persistence.clone();
        let generator = self.generator.clone();

        let handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(Self::handle_command),
            )
            .branch(dptree::endpoint(Self::handle_message));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![router, persistence, generator])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .build();

        dispatcher.dispatch().await;

        Ok(())
    }

    /// Split a reply into chunks that fit Telegram's limits, preferring
    /// paragraph and line breaks
    fn split_message(text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for line in text.split_inclusive('\n') {
            if current.chars().count() + line.chars().count() <= MAX_MESSAGE_LENGTH {
                current.push_str(line);
                continue;
            }
            if !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
            }
            current.clear();

            // a single line longer than the limit is cut at char boundaries
            let mut rest = line;
            while rest.chars().count() > MAX_MESSAGE_LENGTH {
                let cut = rest
                    .char_indices()
                    .nth(MAX_MESSAGE_LENGTH)
                    .map(|(index, _)| index)
                    .unwrap_or(rest.len());
                chunks.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current.push_str(rest);
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }
        chunks
    }

    /// Reply to `msg`, splitting if necessary
    async fn reply_safe(bot: &Bot, msg: &Message, text: &str) -> ResponseResult<()> {
        let chunks = Self::split_message(text);
        for (i, chunk) in chunks.iter().enumerate() {
            let body = if chunks.len() > 1 {
                format!("({}/{})\n\n{}", i + 1, chunks.len(), chunk)
            } else {
                chunk.clone()
            };
            bot.send_message(msg.chat.id, body)
                .reply_parameters(ReplyParameters::new(msg.id))
                .await?;
        }
        Ok(())
    }

    /// Handle bot commands
    async fn handle_command(
        bot: Bot,
        msg: Message,
        cmd: Command,
        router: Arc<MessageRouter>,
        persistence: Arc<PersistenceService>,
        generator: Arc<TextGenerator>,
    ) -> ResponseResult<()> {
        let chat_id = msg.chat.id;

        match cmd {
            Command::Start => {
                bot.send_message(
                    chat_id,
                    "📥 Telegram Sync is listening.\n\n\
                     Every message you send here is saved to the vault: text becomes a note, \
                     photos, documents, audio and video are stored as files.\n\n\
                     /help - Show commands",
                )
                .await?;
            }
            Command::Help => {
                bot.send_message(chat_id, Command::descriptions().to_string())
                    .await?;
            }
            Command::Status | Command::Ask(_) => {
                let sender = msg.from.as_ref().and_then(|user| user.username.as_deref());
                if !router.is_allowed(sender) {
                    Self::reply_safe(&bot, &msg, &access_denied_notice(sender.unwrap_or_default()))
                        .await?;
                    return Ok(());
                }
                match cmd {
                    Command::Ask(prompt) => {
                        Self::handle_ask(&bot, &msg, &generator, prompt.trim()).await?
                    }
                    _ => Self::handle_status(&bot, &msg, &persistence).await?,
                }
            }
        }

        Ok(())
    }

    async fn handle_status(
        bot: &Bot,
        msg: &Message,
        persistence: &PersistenceService,
    ) -> ResponseResult<()> {
        let chat_id = msg.chat.id.0;
        let counts = tokio::try_join!(
            persistence.processed_count(chat_id),
            persistence.failed_count(chat_id)
        );
        let text = match counts {
            Ok((processed, failed)) => format!(
                "Saved {} message(s) from this chat, {} of them with errors.",
                processed, failed
            ),
            Err(e) => {
                error!(chat_id, "Failed to read processed-message log: {}", e);
                "Could not read the processed-message log.".to_string()
            }
        };
        Self::reply_safe(bot, msg, &text).await
    }

    async fn handle_ask(
        bot: &Bot,
        msg: &Message,
        generator: &TextGenerator,
        prompt: &str,
    ) -> ResponseResult<()> {
        if prompt.is_empty() {
            return Self::reply_safe(bot, msg, "Usage: /ask <prompt>").await;
        }
        if !generator.is_configured() {
            return Self::reply_safe(
                bot,
                msg,
                "Text generation is not configured. Set [openai] api_key in \
                 ~/.tgsync/tgsync.toml or the OPENAI_API_KEY environment variable.",
            )
            .await;
        }

        debug!(chat_id = msg.chat.id.0, "Generating text");
        let answer = generator.generate(prompt).await;
        Self::reply_safe(bot, msg, &answer).await
    }

    /// Hand every other message to the ingestion router
    async fn handle_message(msg: Message, router: Arc<MessageRouter>) -> ResponseResult<()> {
        let inbound = to_inbound(&msg);
        debug!(
            chat_id = inbound.chat_id,
            message_id = inbound.id,
            has_text = inbound.text.is_some(),
            has_attachment = inbound.attachment.is_some(),
            "Message received"
        );
        router.route(inbound).await;
        Ok(())
    }
}
