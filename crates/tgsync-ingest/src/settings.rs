use serde::Deserialize;

/// Ingestion settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Telegram usernames (without `@`) allowed to write into the vault
    #[serde(default)]
    pub allowed_usernames: Vec<String>,

    /// Folder for notes; empty means the vault root
    #[serde(default)]
    pub new_notes_location: String,

    /// Folder for attachments; falls back to the notes folder when empty
    #[serde(default)]
    pub new_files_location: String,

    /// Vault path of the note template; empty disables templating
    #[serde(default)]
    pub template_file_location: String,

    /// Queue rendered messages for a consolidated append instead of
    /// writing one note per message
    #[serde(default)]
    pub append_all_to_telegram_md: bool,
}

impl Settings {
    pub fn is_allowed(&self, handle: Option<&str>) -> bool {
        match handle {
            Some(handle) if !handle.is_empty() => {
                let handle = handle.trim_start_matches('@');
                self.allowed_usernames
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('@') == handle)
            }
            _ => false,
        }
    }

    pub fn notes_location(&self) -> &str {
        self.new_notes_location.trim()
    }

    /// Base folder for stored attachments
    pub fn files_location(&self) -> &str {
        let files = self.new_files_location.trim();
        if files.is_empty() {
            self.notes_location()
        } else {
            files
        }
    }

    pub fn template_path(&self) -> Option<&str> {
        let path = self.template_file_location.trim();
        (!path.is_empty()).then_some(path)
    }
}
