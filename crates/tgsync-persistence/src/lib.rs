use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

const VERSION_MARKER_KEY: &str = "plugin_version";

/// Persistence service for the bot's own state in SQLite
pub struct PersistenceService {
    pool: SqlitePool,
}

impl PersistenceService {
    /// Open (or create) the database and run migrations
    pub async fn new(database_path: &str) -> Result<Self> {
        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = SqlitePool::connect(&database_url).await?;

        let service = Self { pool };
        service.run_migrations().await?;

        info!("Persistence service initialized with database: {}", database_path);
        Ok(service)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS processed_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                outcome TEXT NOT NULL,
                error TEXT,
                processed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_processed_chat_id ON processed_messages(chat_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Version marker saved by the last release notice, if any
    pub async fn load_version_marker(&self) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(VERSION_MARKER_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn save_version_marker(&self, version: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(VERSION_MARKER_KEY)
        .bind(version)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(version, "Version marker saved");
        Ok(())
    }

    /// Record the terminal outcome of one message
    pub async fn record_processed(
        &self,
        chat_id: i64,
        message_id: i32,
        error: Option<&str>,
    ) -> Result<()> {
        let outcome = if error.is_some() { "failed" } else { "ok" };
        sqlx::query(
            r#"
            INSERT INTO processed_messages (chat_id, message_id, outcome, error, processed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(chat_id)
        .bind(message_id)
        .bind(outcome)
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of messages recorded for a chat
    pub async fn processed_count(&self, chat_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM processed_messages WHERE chat_id = ?")
                .bind(chat_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Number of failed messages recorded for a chat
    pub async fn failed_count(&self, chat_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM processed_messages WHERE chat_id = ? AND outcome = 'failed'",
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
