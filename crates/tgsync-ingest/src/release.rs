use crate::surface::{ChatSurface, LinkButton, ParseMode, ReplyOptions};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tgsync_types::ChatId;
use tracing::info;

/// Suffix on a release version that asks for the changelog to be announced
pub const ANNOUNCE_MARKER: char = '!';

/// Persisted "last seen version" marker
#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, version: &str) -> Result<()>;
}

/// Changelog of the running release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotes {
    /// Version, optionally suffixed with [`ANNOUNCE_MARKER`]
    pub version: String,
    pub new_features: String,
    pub bug_fixes: String,
    pub road_map: String,
    pub donation_links: Vec<LinkButton>,
}

impl ReleaseNotes {
    /// Notes for this build
    pub fn current() -> Self {
        Self {
            version: format!("{}{}", env!("CARGO_PKG_VERSION"), ANNOUNCE_MARKER),
            new_features: "\n- Large files are fetched through a self-hosted Bot API server\
                           \n- Notes and files never overwrite each other\n"
                .to_string(),
            bug_fixes: "\n- Progress indicator is removed when a download fails\n".to_string(),
            road_map: "\n- Consolidated append of queued messages\n".to_string(),
            donation_links: Vec::new(),
        }
    }

    pub fn with_donation_links(mut self, links: Vec<LinkButton>) -> Self {
        self.donation_links = links;
        self
    }

    /// Version without the announce marker
    pub fn version_code(&self) -> String {
        self.version.replace(ANNOUNCE_MARKER, "")
    }

    pub fn wants_announcement(&self) -> bool {
        self.version.contains(ANNOUNCE_MARKER)
    }

    /// HTML changelog message
    pub fn render(&self) -> String {
        let mut text = format!("<b>Telegram Sync {}</b>\n\n", self.version_code());
        text.push_str(&format!("<u>New Features</u>{}\n", self.new_features));
        text.push_str(&format!("<u>Bug Fixes</u>{}\n", self.bug_fixes));
        text.push_str(&format!("<u>Possible Road Map</u>{}\n", self.road_map));
        if !self.donation_links.is_empty() {
            text.push_str(
                "<b>If you like this project and are considering donating to support \
                 continued development, use the buttons below!</b>",
            );
        }
        text
    }

    /// Donation links laid out two per row
    fn button_rows(&self) -> Vec<Vec<LinkButton>> {
        self.donation_links
            .chunks(2)
            .map(<[LinkButton]>::to_vec)
            .collect()
    }
}

/// Announces a new release once per version transition
pub struct ReleaseNotice {
    store: Arc<dyn VersionStore>,
    surface: Arc<dyn ChatSurface>,
    notes: ReleaseNotes,
}

impl ReleaseNotice {
    pub fn new(store: Arc<dyn VersionStore>, surface: Arc<dyn ChatSurface>, notes: ReleaseNotes) -> Self {
        Self {
            store,
            surface,
            notes,
        }
    }

    /// Compare the stored marker with the running version. Returns whether a
    /// changelog was sent to `chat_id`.
    ///
    /// A first run only records the version. An upgrade is announced when the
    /// running version carries the marker.
    pub async fn check(&self, chat_id: ChatId) -> Result<bool> {
        let code = self.notes.version_code();
        match self.store.load().await? {
            Some(stored) if stored != code && self.notes.wants_announcement() => {
                self.store.save(&code).await?;
                let options = ReplyOptions {
                    reply_to: None,
                    parse_mode: ParseMode::Html,
                    buttons: self.notes.button_rows(),
                };
                self.surface
                    .reply(chat_id, &self.notes.render(), options)
                    .await?;
                info!(from = %stored, to = %code, "Release notes sent");
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                self.store.save(&code).await?;
                info!(version = %code, "Version marker initialized");
                Ok(false)
            }
        }
    }
}
