use crate::config::Config;
use anyhow::{bail, Result};
use std::sync::Arc;
use teloxide::Bot;
use tgsync_channel::{
    BotApiTransport, LocalBotApiTransport, SqliteVersionStore, TelegramService, TelegramSurface,
};
use tgsync_ingest::{
    ChatSurface, Collaborators, FallbackTransport, IngestState, MessageRouter, MiniJinjaRenderer,
    NoFallback, ReleaseNotes, ReleaseNotice,
};
use tgsync_logging::LogFormat;
use tgsync_persistence::PersistenceService;
use tgsync_vault::{FsVault, Vault};

use tokio::signal;
use tracing::{error, info, warn};

/// Gateway service - main orchestrator
pub struct GatewayService {
    config: Config,
}

impl GatewayService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the gateway service
    pub async fn run(self) -> Result<()> {
        tgsync_logging::init_logging(
            &self.config.logging.level,
            LogFormat::parse(&self.config.logging.format),
        )?;
        info!("Starting Telegram Sync");

        if self.config.telegram.bot_token.trim().is_empty() {
            bail!("No bot token configured. Set TELEGRAM_BOT_TOKEN or edit ~/.tgsync/tgsync.toml");
        }
        if self.config.vault.path.trim().is_empty() {
            bail!("No vault configured. Set TGSYNC_VAULT_PATH or edit ~/.tgsync/tgsync.toml");
        }

        let settings = self.config.ingest_settings();
        if settings.allowed_usernames.is_empty() {
            warn!("allowed_usernames is empty: every message will be refused");
        }
        info!(
            vault = %self.config.vault.path,
            notes = settings.notes_location(),
            files = settings.files_location(),
            batched = settings.append_all_to_telegram_md,
            "Vault configured"
        );

        // Initialize persistence
        let persistence = Arc::new(PersistenceService::new(&self.config.database.path).await?);
        info!("Persistence service initialized");

        let bot = Bot::new(&self.config.telegram.bot_token);
        let vault: Arc<dyn Vault> = Arc::new(FsVault::new(&self.config.vault.path));
        let surface: Arc<dyn ChatSurface> =
            Arc::new(TelegramSurface::new(bot.clone(), persistence.clone()));

        let fallback: Arc<dyn FallbackTransport> = match self.config.local_api_url() {
            Some(url) => Arc::new(LocalBotApiTransport::new(
                url,
                self.config.telegram.bot_token.clone(),
            )),
            None => Arc::new(NoFallback),
        };

        let collab = Collaborators {
            settings: Arc::new(settings),
            vault: vault.clone(),
            renderer: Arc::new(MiniJinjaRenderer::new(vault)),
            surface: surface.clone(),
            transport: Arc::new(BotApiTransport::new(bot.clone())),
            fallback,
        };

        let state = IngestState::new();
        let queue = state.queue.clone();

        let release = ReleaseNotice::new(
            Arc::new(SqliteVersionStore::new(persistence.clone())),
            surface,
            ReleaseNotes::current().with_donation_links(self.config.donation_links()),
        );
        let router = MessageRouter::new(collab, state).with_release_notice(release);

        let telegram_service = TelegramService::new(
            bot,
            router,
            persistence,
            self.config.text_generator(),
        );

        // Setup signal handler for graceful shutdown
        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
            info!("Received shutdown signal");
        };

        tokio::select! {
            result = telegram_service.run() => {
                if let Err(e) = result {
                    error!("Telegram service error: {}", e);
                }
            }
            _ = shutdown => {
                info!("Shutting down gracefully...");
            }
        }

        for entry in queue.drain().await {
            warn!(
                chat_id = entry.message.chat_id,
                message_id = entry.message.id,
                "Queued message was not appended before shutdown"
            );
        }

        info!("Telegram Sync stopped");
        Ok(())
    }
}
