use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tgsync_ingest::{LinkButton, Settings};
use tgsync_provider::TextGenerator;

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
[telegram]
bot_token = ""  # Set via TELEGRAM_BOT_TOKEN env var
allowed_usernames = []  # Telegram usernames without "@"
local_api_url = ""  # Optional self-hosted Bot API server for files over 20 MB

[vault]
path = ""  # Set via TGSYNC_VAULT_PATH env var
new_notes_location = ""
new_files_location = ""
template_file_location = ""
append_all_to_telegram_md = false

[openai]
api_key = ""  # Set via OPENAI_API_KEY env var; enables /ask
model = "gpt-4o-mini"
base_url = ""  # Optional: Set via OPENAI_BASE_URL env var

[database]
path = "tgsync.db"

[logging]
level = "info"  # trace, debug, info, warn, error
format = "pretty"  # pretty, json

[release]
donation_links = []  # e.g. [{ text = "Sponsor", url = "https://..." }]
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default)]
    pub allowed_usernames: Vec<String>,
    #[serde(default)]
    pub local_api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    pub path: String,
    #[serde(default)]
    pub new_notes_location: String,
    #[serde(default)]
    pub new_files_location: String,
    #[serde(default)]
    pub template_file_location: String,
    #[serde(default)]
    pub append_all_to_telegram_md: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

fn default_format() -> String {
    "pretty".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DonationLink {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub donation_links: Vec<DonationLink>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub vault: VaultConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub release: ReleaseConfig,
}

impl Config {
    /// Get the global config path: ~/.tgsync/tgsync.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".tgsync").join("tgsync.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()?;
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).with_context(|| {
                    format!("Failed to create config directory {}", config_dir.display())
                })?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
            eprintln!("Please edit this file or set environment variables.");
        }

        Ok(config_path)
    }

    /// File layers shared by [`Config::load`] and the tests
    fn file_layers(
        global: &Path,
        local: &str,
    ) -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .add_source(config::File::from(global.to_path_buf()))
            .add_source(config::File::with_name(local).required(false))
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.tgsync/tgsync.toml (auto-created if missing)
    /// 2. Local override: ./tgsync.toml (optional)
    /// 3. Environment variables (`TGSYNC__VAULT__PATH`, ...)
    /// 4. `TELEGRAM_BOT_TOKEN`, `TGSYNC_VAULT_PATH`, `OPENAI_API_KEY` and
    ///    `OPENAI_BASE_URL` (highest priority)
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let global_config_path = Self::ensure_global_config()?;

        let mut config_builder = Self::file_layers(&global_config_path, "tgsync").add_source(
            config::Environment::with_prefix("TGSYNC")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("telegram.allowed_usernames")
                .try_parsing(true),
        );

        if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
            config_builder = config_builder.set_override("telegram.bot_token", token)?;
        }

        if let Ok(path) = env::var("TGSYNC_VAULT_PATH") {
            config_builder = config_builder.set_override("vault.path", path)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config_builder = config_builder.set_override("openai.api_key", key)?;
        }

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config_builder = config_builder.set_override("openai.base_url", url)?;
        }

        let config: Self = config_builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Ingestion settings assembled from the telegram and vault sections
    pub fn ingest_settings(&self) -> Settings {
        Settings {
            allowed_usernames: self.telegram.allowed_usernames.clone(),
            new_notes_location: self.vault.new_notes_location.clone(),
            new_files_location: self.vault.new_files_location.clone(),
            template_file_location: self.vault.template_file_location.clone(),
            append_all_to_telegram_md: self.vault.append_all_to_telegram_md,
        }
    }

    pub fn donation_links(&self) -> Vec<LinkButton> {
        self.release
            .donation_links
            .iter()
            .map(|link| LinkButton::new(link.text.clone(), link.url.clone()))
            .collect()
    }

    pub fn text_generator(&self) -> TextGenerator {
        TextGenerator::new(Some(self.openai.api_key.clone()), &self.openai.model)
            .with_base_url(Some(self.openai.base_url.clone()))
    }

    /// Base URL of the self-hosted Bot API server, if configured
    pub fn local_api_url(&self) -> Option<&str> {
        let url = self.telegram.local_api_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn from_files(global: &str, local: Option<&str>) -> Config {
        let dir = tempdir().unwrap();
        let global_path = dir.path().join("global.toml");
        fs::write(&global_path, global).unwrap();
        let local_name = dir.path().join("local");
        if let Some(local) = local {
            fs::write(dir.path().join("local.toml"), local).unwrap();
        }
        Config::file_layers(&global_path, local_name.to_str().unwrap())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_template_parses() {
        let config = from_files(DEFAULT_CONFIG, None);
        assert_eq!(config.database.path, "tgsync.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.telegram.allowed_usernames.is_empty());
        assert!(config.local_api_url().is_none());
        assert!(config.donation_links().is_empty());
        assert!(!config.vault.append_all_to_telegram_md);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert!(!config.text_generator().is_configured());
    }

    #[test]
    fn test_openai_section_is_optional() {
        let global = r#"
[telegram]
bot_token = ""

[vault]
path = "/srv/vault"

[database]
path = "tgsync.db"

[logging]
level = "debug"
"#;
        let config = from_files(global, Some("[openai]\napi_key = \"sk-local\"\n"));
        assert_eq!(config.logging.format, "pretty");
        assert!(config.text_generator().is_configured());

        let config = from_files(global, None);
        assert!(!config.text_generator().is_configured());
    }

    #[test]
    fn test_local_file_overrides_global() {
        let local = r#"
[telegram]
bot_token = "123:abc"
allowed_usernames = ["alice", "@bob"]
local_api_url = " http://localhost:8081 "

[vault]
path = "/srv/vault"
new_notes_location = "Inbox"
template_file_location = "Templates/telegram.md"

[release]
donation_links = [{ text = "Sponsor", url = "https://example.org/sponsor" }]
"#;
        let config = from_files(DEFAULT_CONFIG, Some(local));
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.vault.path, "/srv/vault");
        assert_eq!(config.local_api_url(), Some("http://localhost:8081"));

        let settings = config.ingest_settings();
        assert!(settings.is_allowed(Some("alice")));
        assert!(settings.is_allowed(Some("bob")));
        assert_eq!(settings.notes_location(), "Inbox");
        assert_eq!(settings.files_location(), "Inbox");
        assert_eq!(settings.template_path(), Some("Templates/telegram.md"));

        let links = config.donation_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Sponsor");
        // untouched sections keep the global values
        assert_eq!(config.database.path, "tgsync.db");
    }
}
