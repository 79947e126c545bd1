//! tgsync Ingest - turns chat messages into vault files
//!
//! [`MessageRouter`] is the entry point. It authorizes the sender and either
//! writes a note for a text message or hands the message to [`FileIngestor`],
//! which downloads the attachment (streaming with progress, falling back to
//! a one-shot transport for oversized files), stores it under a unique path
//! and composes a companion note or a queued entry.

pub mod ingestor;
pub mod notes;
pub mod progress;
pub mod queue;
pub mod release;
pub mod router;
pub mod settings;
pub mod surface;
pub mod template;
pub mod transport;

pub use ingestor::FileIngestor;
pub use progress::{ProgressHandle, ProgressReporter, ProgressStages};
pub use queue::QueueSink;
pub use release::{ReleaseNotes, ReleaseNotice, VersionStore};
pub use router::{access_denied_notice, MessageRouter};
pub use settings::Settings;
pub use surface::{ChatSurface, LinkButton, ParseMode, ReplyOptions};
pub use template::{MiniJinjaRenderer, TemplateRenderer};
pub use transport::{ByteStream, FallbackTransport, FileTransport, NoFallback};

use std::sync::Arc;
use tgsync_vault::{AllocatedPaths, Clock, PathAllocator, SystemClock, Vault};

/// Process-wide mutable state shared by all in-flight ingestions.
///
/// Created once at startup and handed to the router; the allocated-path index
/// lives only in memory.
#[derive(Clone)]
pub struct IngestState {
    pub paths: AllocatedPaths,
    pub queue: QueueSink,
    pub clock: Arc<dyn Clock>,
}

impl IngestState {
    pub fn new() -> Self {
        Self {
            paths: AllocatedPaths::new(),
            queue: QueueSink::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn allocator(&self, vault: Arc<dyn Vault>) -> PathAllocator {
        PathAllocator::new(vault, self.paths.clone()).with_clock(self.clock.clone())
    }
}

impl Default for IngestState {
    fn default() -> Self {
        Self::new()
    }
}

/// External services the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<Settings>,
    pub vault: Arc<dyn Vault>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub surface: Arc<dyn ChatSurface>,
    pub transport: Arc<dyn FileTransport>,
    pub fallback: Arc<dyn FallbackTransport>,
}
