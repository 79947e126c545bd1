//! File transports
//!
//! The primary transport streams a file chunk by chunk and may refuse large
//! files with [`TransportError::TooLarge`]. The fallback fetches the whole
//! payload in one call and is only consulted after such a refusal.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tgsync_types::TransportError;

/// Chunks of a remote file
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Downloadable link for the remote file
    async fn resolve_link(&self, handle: &str) -> Result<String, TransportError>;

    async fn open_stream(&self, handle: &str) -> Result<ByteStream, TransportError>;
}

#[async_trait]
pub trait FallbackTransport: Send + Sync {
    /// Fetch the full payload; `size_hint` is the size declared by the message
    async fn fetch_all(&self, handle: &str, size_hint: u64) -> Result<Vec<u8>, TransportError>;
}

/// Fallback used when no secondary transport is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

#[async_trait]
impl FallbackTransport for NoFallback {
    async fn fetch_all(&self, _handle: &str, size_hint: u64) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Other(format!(
            "file of {} bytes exceeds the Bot API limit and no fallback transport is configured",
            size_hint
        )))
    }
}
