use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;
use teloxide::RequestError;
use tgsync_ingest::{ByteStream, FallbackTransport, FileTransport};
use tgsync_types::TransportError;
use tracing::{debug, info, warn};

/// Error text Telegram returns for files above the Bot API download limit
const TOO_BIG_MARKER: &str = "file is too big";

fn transport_error(error: RequestError) -> TransportError {
    let text = error.to_string();
    if text.contains(TOO_BIG_MARKER) {
        TransportError::TooLarge
    } else {
        TransportError::Other(text)
    }
}

/// Primary transport: the public Bot API, streamed through teloxide
#[derive(Clone)]
pub struct BotApiTransport {
    bot: Bot,
}

impl BotApiTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn file_path(&self, handle: &str) -> Result<String, TransportError> {
        let file = self
            .bot
            .get_file(FileId(handle.to_string()))
            .await
            .map_err(transport_error)?;
        Ok(file.path)
    }
}

#[async_trait]
impl FileTransport for BotApiTransport {
    async fn resolve_link(&self, handle: &str) -> Result<String, TransportError> {
        let path = self.file_path(handle).await?;
        self.bot
            .api_url()
            .join(&format!("file/bot{}/{}", self.bot.token(), path))
            .map(|url| url.to_string())
            .map_err(|e| TransportError::Other(e.to_string()))
    }

    async fn open_stream(&self, handle: &str) -> Result<ByteStream, TransportError> {
        let path = self.file_path(handle).await?;
        let stream = self
            .bot
            .download_file_stream(&path)
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Other(e.to_string()))
            });
        Ok(stream.boxed())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    file_path: Option<String>,
}

/// Fallback transport: a self-hosted Bot API server without the
/// download size limit.
///
/// Servers running with `--local` answer `getFile` with an absolute path on
/// their own disk; when that path is readable from here it is read directly.
#[derive(Clone)]
pub struct LocalBotApiTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl LocalBotApiTransport {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, "Local Bot API fallback configured");
        Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base_url,
            self.token,
            file_path.trim_start_matches('/')
        )
    }

    async fn remote_path(&self, handle: &str) -> Result<String, TransportError> {
        let url = format!("{}/bot{}/getFile", self.base_url, self.token);
        let response: ApiResponse<RemoteFile> = self
            .client
            .get(&url)
            .query(&[("file_id", handle)])
            .send()
            .await
            .map_err(|e| TransportError::Other(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| TransportError::Other(e.without_url().to_string()))?;

        if !response.ok {
            return Err(TransportError::Other(
                response
                    .description
                    .unwrap_or_else(|| "getFile failed".to_string()),
            ));
        }
        response
            .result
            .and_then(|file| file.file_path)
            .ok_or_else(|| TransportError::Other("getFile returned no file path".to_string()))
    }
}

#[async_trait]
impl FallbackTransport for LocalBotApiTransport {
    async fn fetch_all(&self, handle: &str, size_hint: u64) -> Result<Vec<u8>, TransportError> {
        let file_path = self.remote_path(handle).await?;

        let bytes = if Path::new(&file_path).is_absolute()
            && tokio::fs::try_exists(&file_path).await.unwrap_or(false)
        {
            debug!(path = %file_path, "Reading file from local Bot API storage");
            tokio::fs::read(&file_path)
                .await
                .map_err(|e| TransportError::Other(e.to_string()))?
        } else {
            let response = self
                .client
                .get(self.file_url(&file_path))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| TransportError::Other(e.without_url().to_string()))?;
            response
                .bytes()
                .await
                .map_err(|e| TransportError::Other(e.without_url().to_string()))?
                .to_vec()
        };

        if size_hint > 0 && bytes.len() as u64 != size_hint {
            warn!(
                expected = size_hint,
                received = bytes.len(),
                "Fallback download size differs from the declared size"
            );
        }
        Ok(bytes)
    }
}
