use async_trait::async_trait;
use minijinja::{context, Environment};
use std::sync::Arc;
use tgsync_types::{InboundMessage, IngestError};
use tgsync_vault::naming::{date_string, time_string};
use tgsync_vault::Vault;
use tracing::debug;

/// Template used when no template file is configured
pub const DEFAULT_TEMPLATE: &str = "{{ content }}";

/// Renders the body of a note for a message
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(
        &self,
        template_path: Option<&str>,
        message: &InboundMessage,
        content_ref: Option<&str>,
    ) -> Result<String, IngestError>;
}

/// Reads templates from the vault and renders them with minijinja.
///
/// Variables: `content`, `text`, `caption`, `file`, `user`, `chat_id`,
/// `message_id`, `date`, `time`, `datetime`.
pub struct MiniJinjaRenderer {
    vault: Arc<dyn Vault>,
}

impl MiniJinjaRenderer {
    pub fn new(vault: Arc<dyn Vault>) -> Self {
        Self { vault }
    }

    async fn load(&self, template_path: Option<&str>) -> Result<String, IngestError> {
        match template_path {
            Some(path) => self
                .vault
                .read_text(path)
                .await
                .map_err(|e| IngestError::Template(format!("cannot read '{}': {}", path, e))),
            None => Ok(DEFAULT_TEMPLATE.to_string()),
        }
    }
}

/// File link followed by the message text or caption
pub fn default_content(message: &InboundMessage, content_ref: Option<&str>) -> String {
    [content_ref, message.text.as_deref().or(message.caption.as_deref())]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl TemplateRenderer for MiniJinjaRenderer {
    async fn render(
        &self,
        template_path: Option<&str>,
        message: &InboundMessage,
        content_ref: Option<&str>,
    ) -> Result<String, IngestError> {
        let source = self.load(template_path).await?;
        let env = Environment::new();
        let rendered = env
            .render_str(
                &source,
                context! {
                    content => default_content(message, content_ref),
                    text => message.text.as_deref(),
                    caption => message.caption.as_deref(),
                    file => content_ref,
                    user => message.sender.as_deref(),
                    chat_id => message.chat_id,
                    message_id => message.id,
                    date => date_string(message.date),
                    time => time_string(message.date),
                    datetime => message.date.to_rfc3339(),
                },
            )
            .map_err(|e| IngestError::Template(e.to_string()))?;

        debug!(
            message_id = message.id,
            template = template_path.unwrap_or("<default>"),
            "Note content rendered"
        );
        Ok(rendered)
    }
}
