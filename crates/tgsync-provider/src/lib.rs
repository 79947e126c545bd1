//! tgsync Provider - text generation through an OpenAI-compatible API

use anyhow::{anyhow, Result};
use async_openai::{config::OpenAIConfig, Client};
use tracing::{error, info};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Reply used whenever generation fails
pub const FALLBACK_REPLY: &str = "An error occurred while processing your request.";

/// Single-prompt chat completion client
#[derive(Debug, Clone)]
pub struct TextGenerator {
    api_key: Option<String>,
    model: String,
    base_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TextGenerator {
    /// Blank keys count as missing; a blank model selects [`DEFAULT_MODEL`].
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        let api_key = non_empty(api_key);
        let model = match model.trim() {
            "" => DEFAULT_MODEL.to_string(),
            model => model.to_string(),
        };
        info!(model = %model, configured = api_key.is_some(), "Text generator initialized");
        Self {
            api_key,
            model,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = non_empty(base_url);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Complete `prompt` as a single user message
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        use async_openai::types::chat::{
            ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        };

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow!("OpenAI API key is not set. Set [openai] api_key or OPENAI_API_KEY")
        })?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &self.base_url {
            config = config.with_api_base(base_url);
        }
        let client = Client::with_config(config);

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into()])
            .build()?;

        let response = client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone());
        reply_text(content)
    }

    /// Like [`TextGenerator::complete`], but any failure becomes [`FALLBACK_REPLY`]
    pub async fn generate(&self, prompt: &str) -> String {
        match self.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!("Error generating text with OpenAI API: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

fn reply_text(content: Option<String>) -> Result<String> {
    content
        .map(|text| text.trim().to_string())
        .ok_or_else(|| anyhow!("OpenAI returned no message content"))
}
