//! End-to-end routing scenarios against in-memory fakes

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tgsync_ingest::{
    ByteStream, ChatSurface, Collaborators, FallbackTransport, FileTransport, IngestState,
    MessageRouter, MiniJinjaRenderer, ParseMode, ReleaseNotes, ReleaseNotice, ReplyOptions,
    Settings, VersionStore,
};
use tgsync_types::{
    Attachment, ChatId, FileDescriptor, InboundMessage, IngestError, MessageId, TransportError,
    FILE_ERROR_MARKER,
};
use tgsync_vault::naming::{date_string, time_string};
use tgsync_vault::{Clock, MemoryVault, Vault};

const CHAT: ChatId = 4242;

#[derive(Default)]
struct RecordingSurface {
    /// Replies, edits and deletes fail while set
    unavailable: AtomicBool,
    next_id: AtomicI64,
    replies: Mutex<Vec<(ChatId, String, ReplyOptions)>>,
    edits: Mutex<Vec<(MessageId, String)>>,
    deletes: Mutex<Vec<MessageId>>,
    processed: Mutex<Vec<(MessageId, Option<IngestError>)>>,
}

impl RecordingSurface {
    fn unavailable() -> Self {
        Self {
            unavailable: AtomicBool::new(true),
            ..Default::default()
        }
    }
    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("chat unavailable"));
        }
        Ok(())
    }
    fn replies(&self) -> Vec<(ChatId, String, ReplyOptions)> {
        self.replies.lock().unwrap().clone()
    }
    fn edits(&self) -> usize {
        self.edits.lock().unwrap().len()
    }
    fn deletes(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }
    fn processed(&self) -> Vec<(MessageId, Option<IngestError>)> {
        self.processed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSurface for RecordingSurface {
    async fn reply(&self, chat_id: ChatId, text: &str, options: ReplyOptions) -> Result<MessageId> {
        self.check_available()?;
        self.replies
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), options));
        Ok(1000 + self.next_id.fetch_add(1, Ordering::SeqCst) as MessageId)
    }

    async fn edit(&self, _chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        self.check_available()?;
        self.edits
            .lock()
            .unwrap()
            .push((message_id, text.to_string()));
        Ok(())
    }

    async fn delete(&self, _chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.check_available()?;
        self.deletes.lock().unwrap().push(message_id);
        Ok(())
    }

    async fn mark_processed(
        &self,
        message: &InboundMessage,
        error: Option<&IngestError>,
    ) -> Result<()> {
        self.processed
            .lock()
            .unwrap()
            .push((message.id, error.cloned()));
        Ok(())
    }
}

/// Bot-API-like transport with a size ceiling
struct FakeTransport {
    ceiling: u64,
    payload: Vec<u8>,
    chunk_size: usize,
    failure: Option<TransportError>,
    /// Number of chunks delivered before the stream errors
    break_after: Option<usize>,
    opened: AtomicUsize,
}

impl FakeTransport {
    fn serving(payload: Vec<u8>) -> Self {
        Self {
            ceiling: 20 * 1024 * 1024,
            payload,
            chunk_size: 1000,
            failure: None,
            break_after: None,
            opened: AtomicUsize::new(0),
        }
    }

    fn failing(failure: TransportError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::serving(Vec::new())
        }
    }

    fn breaking_after(mut self, chunks: usize) -> Self {
        self.break_after = Some(chunks);
        self
    }

    fn with_ceiling(mut self, ceiling: u64) -> Self {
        self.ceiling = ceiling;
        self
    }
}

#[async_trait]
impl FileTransport for FakeTransport {
    async fn resolve_link(&self, handle: &str) -> Result<String, TransportError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if self.payload.len() as u64 > self.ceiling {
            return Err(TransportError::TooLarge);
        }
        Ok(format!("https://api.telegram.org/file/botTOKEN/files/file_{}.bin", handle))
    }

    async fn open_stream(&self, _handle: &str) -> Result<ByteStream, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut chunks: Vec<Result<Vec<u8>, TransportError>> = self
            .payload
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        if let Some(delivered) = self.break_after {
            chunks.truncate(delivered);
            chunks.push(Err(TransportError::Other("connection reset".into())));
        }
        Ok(futures::stream::iter(chunks).boxed())
    }
}

struct FakeFallback {
    payload: Option<Vec<u8>>,
    calls: Mutex<Vec<(String, u64)>>,
}

impl FakeFallback {
    fn serving(payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn broken() -> Self {
        Self {
            payload: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FallbackTransport for FakeFallback {
    async fn fetch_all(&self, handle: &str, size_hint: u64) -> Result<Vec<u8>, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((handle.to_string(), size_hint));
        self.payload
            .clone()
            .ok_or_else(|| TransportError::Other("fallback unavailable".into()))
    }
}

#[derive(Default)]
struct MemoryVersionStore {
    value: Mutex<Option<String>>,
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.value.lock().unwrap().clone())
    }

    async fn save(&self, version: &str) -> Result<()> {
        *self.value.lock().unwrap() = Some(version.to_string());
        Ok(())
    }
}

struct BrokenVersionStore;

#[async_trait]
impl VersionStore for BrokenVersionStore {
    async fn load(&self) -> Result<Option<String>> {
        Err(anyhow!("database locked"))
    }

    async fn save(&self, _version: &str) -> Result<()> {
        Err(anyhow!("database locked"))
    }
}

struct SteppingClock(AtomicI64);

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.0.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }
}

fn message_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 8, 15, 30).unwrap()
}

fn stamp() -> String {
    format!("{}{}", date_string(message_date()), time_string(message_date()))
}

fn message(id: MessageId, sender: &str) -> InboundMessage {
    InboundMessage::new(id, CHAT, Some(sender.to_string()), message_date())
}

fn settings() -> Settings {
    Settings {
        allowed_usernames: vec!["alice".to_string()],
        new_notes_location: "Telegram".to_string(),
        ..Default::default()
    }
}

struct Harness {
    vault: Arc<MemoryVault>,
    surface: Arc<RecordingSurface>,
    transport: Arc<FakeTransport>,
    fallback: Arc<FakeFallback>,
    state: IngestState,
    router: MessageRouter,
}

impl Harness {
    fn new(settings: Settings, transport: FakeTransport, fallback: FakeFallback) -> Self {
        Self::with_surface(settings, RecordingSurface::default(), transport, fallback)
    }

    fn with_surface(
        settings: Settings,
        surface: RecordingSurface,
        transport: FakeTransport,
        fallback: FakeFallback,
    ) -> Self {
        let vault = Arc::new(MemoryVault::new());
        let surface = Arc::new(surface);
        let transport = Arc::new(transport);
        let fallback = Arc::new(fallback);
        let state = IngestState::new().with_clock(Arc::new(SteppingClock(AtomicI64::new(
            message_date().timestamp() + 60,
        ))));
        let collab = Collaborators {
            settings: Arc::new(settings),
            vault: vault.clone(),
            renderer: Arc::new(MiniJinjaRenderer::new(vault.clone())),
            surface: surface.clone(),
            transport: transport.clone(),
            fallback: fallback.clone(),
        };
        let router = MessageRouter::new(collab, state.clone());
        Self {
            vault,
            surface,
            transport,
            fallback,
            state,
            router,
        }
    }

    fn text_only(settings: Settings) -> Self {
        Self::new(
            settings,
            FakeTransport::serving(Vec::new()),
            FakeFallback::broken(),
        )
    }
}

fn document(size: u64) -> Attachment {
    Attachment::Document(
        FileDescriptor::new("doc-1", "uniq-doc", size)
            .with_mime_type("application/pdf")
            .with_display_name("report.pdf"),
    )
}

#[tokio::test]
async fn text_message_creates_one_note() {
    let h = Harness::text_only(settings());

    h.router
        .route(message(1, "alice").with_text("hello from the train station"))
        .await;

    let paths = h.vault.file_paths().await;
    let expected = format!("Telegram/hello from the train - {}.md", stamp());
    assert_eq!(paths, vec![expected.clone()]);
    assert_eq!(
        h.vault.read_text(&expected).await.unwrap(),
        "hello from the train station"
    );
    assert!(h.vault.has_folder("Telegram").await);
    assert!(h.state.paths.contains(&expected).await);
    assert_eq!(h.state.paths.len().await, 1);
    assert_eq!(h.surface.processed(), vec![(1, None)]);
}

#[tokio::test]
async fn denied_sender_gets_reply_and_nothing_is_written() {
    let h = Harness::text_only(settings());

    h.router.route(message(2, "bob").with_text("hello")).await;

    assert!(h.vault.file_paths().await.is_empty());
    let replies = h.surface.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, CHAT);
    assert!(replies[0].1.starts_with("Access denied"));
    assert!(replies[0].1.contains("bob"));
    assert_eq!(replies[0].2.reply_to, Some(2));
    assert!(h.surface.processed().is_empty());
}

#[tokio::test]
async fn missing_sender_is_denied() {
    let h = Harness::text_only(settings());
    let anonymous = InboundMessage::new(3, CHAT, None, message_date()).with_text("hi");

    h.router.route(anonymous).await;

    assert!(h.vault.file_paths().await.is_empty());
    assert_eq!(h.surface.replies().len(), 1);
}

#[tokio::test]
async fn file_only_message_from_unknown_sender_is_denied() {
    let h = Harness::new(
        settings(),
        FakeTransport::serving(vec![1; 10]),
        FakeFallback::broken(),
    );

    h.router
        .route(message(4, "mallory").with_attachment(document(10)))
        .await;

    assert_eq!(h.transport.opened.load(Ordering::SeqCst), 0);
    assert!(h.vault.file_paths().await.is_empty());
    assert!(h.surface.replies()[0].1.contains("mallory"));
}

#[tokio::test]
async fn same_leading_text_twice_gets_distinct_notes() {
    let h = Harness::text_only(settings());

    h.router
        .route(message(5, "alice").with_text("shopping list: milk, eggs"))
        .await;
    h.router
        .route(message(6, "alice").with_text("shopping list: milk, bread"))
        .await;

    let paths = h.vault.file_paths().await;
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1]);
    for path in &paths {
        assert!(path.starts_with("Telegram/shopping list_ milk, - "));
    }
    assert_eq!(h.state.paths.len().await, 2);
}

#[tokio::test]
async fn batched_text_is_queued_instead_of_written() {
    let h = Harness::text_only(Settings {
        append_all_to_telegram_md: true,
        ..settings()
    });

    h.router.route(message(7, "alice").with_text("first")).await;
    h.router.route(message(8, "alice").with_text("second")).await;

    assert!(h.vault.file_paths().await.is_empty());
    let queued = h.state.queue.snapshot().await;
    let contents: Vec<_> = queued.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert_eq!(h.surface.processed().len(), 2);
}

#[tokio::test]
async fn document_is_streamed_with_progress() {
    let payload = vec![7u8; 3000];
    let h = Harness::new(
        settings(),
        FakeTransport::serving(payload.clone()),
        FakeFallback::broken(),
    );

    let result = h
        .router
        .ingestor()
        .ingest(&message(9, "alice").with_attachment(document(3000)))
        .await;

    let expected = format!("Telegram/documents/report - {}.pdf", stamp());
    assert!(result.is_success());
    assert_eq!(result.stored_path.as_deref(), Some(expected.as_str()));
    assert_eq!(h.vault.file(&expected).await, Some(payload));
    assert_eq!(h.vault.file_paths().await, vec![expected]);

    // start, three stage edits, removal
    assert_eq!(h.surface.replies().len(), 1);
    assert!(h.surface.replies()[0].1.starts_with("downloading"));
    assert_eq!(h.surface.edits(), 3);
    assert_eq!(h.surface.deletes(), 1);
    assert!(h.fallback.calls().is_empty());
    assert_eq!(h.surface.processed(), vec![(9, None)]);
}

#[tokio::test]
async fn document_routed_without_text_goes_to_ingestor() {
    let h = Harness::new(
        settings(),
        FakeTransport::serving(vec![1; 10]),
        FakeFallback::broken(),
    );

    h.router
        .route(message(10, "alice").with_attachment(document(10)))
        .await;

    let paths = h.vault.file_paths().await;
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("Telegram/documents/report - "));
    assert!(paths[0].ends_with(".pdf"));
    assert_eq!(h.surface.processed(), vec![(10, None)]);
}

#[tokio::test]
async fn oversized_file_uses_fallback_without_progress() {
    let payload = vec![3u8; 64];
    let h = Harness::new(
        settings(),
        FakeTransport::serving(payload.clone()).with_ceiling(16),
        FakeFallback::serving(payload.clone()),
    );
    let video = Attachment::Video(
        FileDescriptor::new("vid-1", "AgAD/Zx", 64).with_mime_type("video/mp4"),
    );

    let result = h
        .router
        .ingestor()
        .ingest(&message(11, "alice").with_attachment(video))
        .await;

    let expected = format!("Telegram/videos/video_AgAD_Zx - {}.mp4", stamp());
    assert!(result.is_success());
    assert_eq!(result.stored_path.as_deref(), Some(expected.as_str()));
    assert!(result.content_ref.starts_with("![video_AgAD_Zx]("));
    assert_eq!(h.vault.file(&expected).await, Some(payload));
    assert_eq!(h.fallback.calls(), vec![("vid-1".to_string(), 64)]);
    assert!(h.surface.replies().is_empty());
    assert_eq!(h.surface.edits(), 0);
    assert_eq!(h.surface.processed(), vec![(11, None)]);
}

#[tokio::test]
async fn both_transports_failing_leaves_error_marker() {
    let h = Harness::new(
        Settings {
            append_all_to_telegram_md: true,
            ..settings()
        },
        FakeTransport::failing(TransportError::TooLarge),
        FakeFallback::broken(),
    );

    let result = h
        .router
        .ingestor()
        .ingest(&message(12, "alice").with_attachment(document(50_000_000)))
        .await;

    assert!(!result.is_success());
    assert!(result.stored_path.is_none());
    assert!(result.content_ref.contains(FILE_ERROR_MARKER));
    assert!(h.vault.file_paths().await.is_empty());

    let queued = h.state.queue.snapshot().await;
    assert_eq!(queued.len(), 1);
    assert!(queued[0].content.contains(FILE_ERROR_MARKER));
    assert!(queued[0].error.is_some());

    let processed = h.surface.processed();
    assert_eq!(processed.len(), 1);
    assert!(matches!(processed[0].1, Some(IngestError::Transport(_))));
}

#[tokio::test]
async fn other_transport_errors_skip_fallback() {
    let h = Harness::new(
        settings(),
        FakeTransport::failing(TransportError::Other("connection reset".into())),
        FakeFallback::serving(vec![1, 2, 3]),
    );

    let result = h
        .router
        .ingestor()
        .ingest(&message(13, "alice").with_attachment(document(3)))
        .await;

    assert_eq!(
        result.error,
        Some(IngestError::Transport("connection reset".into()))
    );
    assert!(h.fallback.calls().is_empty());
    assert!(h.vault.file_paths().await.is_empty());
}

#[tokio::test]
async fn message_without_text_or_attachment_fails_cleanly() {
    let h = Harness::text_only(settings());

    h.router.route(message(14, "alice")).await;

    assert!(h.vault.file_paths().await.is_empty());
    assert_eq!(
        h.surface.processed(),
        vec![(14, Some(IngestError::NoAttachment))]
    );
}

#[tokio::test]
async fn photo_uses_largest_variant_and_caption_note() {
    let h = Harness::new(
        Settings {
            template_file_location: "Templates/telegram.md".to_string(),
            new_files_location: "Telegram/files".to_string(),
            ..settings()
        },
        FakeTransport::serving(vec![9; 2500]),
        FakeFallback::broken(),
    );
    h.vault
        .insert("Templates/telegram.md", "{{ file }}\n> {{ caption }}")
        .await;
    let photo = Attachment::Photo(vec![
        FileDescriptor::new("thumb", "u-thumb", 100).with_mime_type("image/jpeg"),
        FileDescriptor::new("full", "u-full", 2500).with_mime_type("image/jpeg"),
    ]);

    let result = h
        .router
        .ingestor()
        .ingest(
            &message(15, "alice")
                .with_caption("sunset at the lake")
                .with_attachment(photo),
        )
        .await;

    let binary = format!("Telegram/files/photos/photo_full - {}.bin", stamp());
    assert_eq!(result.stored_path.as_deref(), Some(binary.as_str()));
    let note = format!("Telegram/sunset at the lake - {}.md", stamp());
    let content = h.vault.read_text(&note).await.unwrap();
    assert_eq!(
        content,
        format!(
            "![photo_full.bin](Telegram/files/photos/photo_full%20-%20{}.bin)\n> sunset at the lake",
            stamp()
        )
    );
    assert_eq!(h.vault.file_paths().await.len(), 3);
}

#[tokio::test]
async fn store_failure_is_reported_as_error_marker() {
    let h = Harness::new(
        Settings {
            template_file_location: "tpl.md".to_string(),
            ..settings()
        },
        FakeTransport::serving(vec![1; 10]),
        FakeFallback::broken(),
    );
    h.vault.insert("tpl.md", "{{ content }}").await;
    h.vault.set_read_only(true);

    let result = h
        .router
        .ingestor()
        .ingest(&message(16, "alice").with_attachment(document(10)))
        .await;

    assert!(matches!(result.error, Some(IngestError::StoreWrite(_))));
    assert!(result.content_ref.contains(FILE_ERROR_MARKER));
    let processed = h.surface.processed();
    assert_eq!(processed.len(), 1);
    assert!(processed[0].1.is_some());
}

#[tokio::test]
async fn release_notes_are_announced_once() {
    let vault = Arc::new(MemoryVault::new());
    let surface = Arc::new(RecordingSurface::default());
    let store = Arc::new(MemoryVersionStore::default());
    store.save("0.0.1").await.unwrap();
    let collab = Collaborators {
        settings: Arc::new(settings()),
        vault: vault.clone(),
        renderer: Arc::new(MiniJinjaRenderer::new(vault.clone())),
        surface: surface.clone(),
        transport: Arc::new(FakeTransport::serving(Vec::new())),
        fallback: Arc::new(FakeFallback::broken()),
    };
    let notes = ReleaseNotes {
        version: "9.9.9!".to_string(),
        ..ReleaseNotes::current()
    };
    let router = MessageRouter::new(collab, IngestState::new()).with_release_notice(
        ReleaseNotice::new(store.clone(), surface.clone(), notes),
    );

    router.route(message(17, "alice").with_text("one")).await;
    router.route(message(18, "alice").with_text("two")).await;

    let announcements: Vec<_> = surface
        .replies()
        .into_iter()
        .filter(|(_, _, options)| options.parse_mode == ParseMode::Html)
        .collect();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].1.contains("9.9.9"));
    assert_eq!(store.load().await.unwrap().as_deref(), Some("9.9.9"));
}

#[tokio::test]
async fn first_run_records_version_silently() {
    let surface = Arc::new(RecordingSurface::default());
    let store = Arc::new(MemoryVersionStore::default());
    let notice = ReleaseNotice::new(store.clone(), surface.clone(), ReleaseNotes::current());

    assert!(!notice.check(CHAT).await.unwrap());
    assert!(surface.replies().is_empty());
    assert_eq!(
        store.load().await.unwrap(),
        Some(ReleaseNotes::current().version_code())
    );
    assert!(!notice.check(CHAT).await.unwrap());
}

#[tokio::test]
async fn unmarked_version_is_not_announced() {
    let surface = Arc::new(RecordingSurface::default());
    let store = Arc::new(MemoryVersionStore::default());
    store.save("1.0.0").await.unwrap();
    let notes = ReleaseNotes {
        version: "1.1.0".to_string(),
        ..ReleaseNotes::current()
    };
    let notice = ReleaseNotice::new(store.clone(), surface.clone(), notes);

    assert!(!notice.check(CHAT).await.unwrap());
    assert!(surface.replies().is_empty());
    assert_eq!(store.load().await.unwrap().as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn broken_version_store_does_not_block_routing() {
    let vault = Arc::new(MemoryVault::new());
    let surface = Arc::new(RecordingSurface::default());
    let collab = Collaborators {
        settings: Arc::new(settings()),
        vault: vault.clone(),
        renderer: Arc::new(MiniJinjaRenderer::new(vault.clone())),
        surface: surface.clone(),
        transport: Arc::new(FakeTransport::serving(Vec::new())),
        fallback: Arc::new(FakeFallback::broken()),
    };
    let router = MessageRouter::new(collab, IngestState::new()).with_release_notice(
        ReleaseNotice::new(Arc::new(BrokenVersionStore), surface.clone(), ReleaseNotes::current()),
    );

    router.route(message(19, "alice").with_text("still works")).await;

    assert_eq!(vault.file_paths().await.len(), 1);
    assert_eq!(surface.processed(), vec![(19, None)]);
}

#[tokio::test]
async fn empty_document_name_falls_back_to_link_name() {
    let h = Harness::new(
        settings(),
        FakeTransport::serving(vec![3u8; 500]),
        FakeFallback::broken(),
    );
    let unnamed = Attachment::Document(
        FileDescriptor::new("doc-1", "uniq-doc", 500)
            .with_mime_type("application/pdf")
            .with_display_name(""),
    );

    let result = h
        .router
        .ingestor()
        .ingest(&message(30, "alice").with_attachment(unnamed))
        .await;

    let expected = format!("Telegram/documents/document_doc-1 - {}.bin", stamp());
    assert!(result.is_success());
    assert_eq!(result.stored_path.as_deref(), Some(expected.as_str()));
    assert_eq!(result.display_name.as_deref(), Some("document_doc-1.bin"));
    assert!(result.content_ref.starts_with("![document_doc-1.bin]("));
}

#[tokio::test]
async fn unavailable_chat_does_not_block_storage() {
    let payload = vec![5u8; 3000];
    let h = Harness::with_surface(
        settings(),
        RecordingSurface::unavailable(),
        FakeTransport::serving(payload.clone()),
        FakeFallback::broken(),
    );

    h.router
        .route(message(31, "alice").with_attachment(document(3000)))
        .await;

    let expected = format!("Telegram/documents/report - {}.pdf", stamp());
    assert_eq!(h.vault.file(&expected).await, Some(payload));
    assert!(h.surface.replies().is_empty());
    assert_eq!(h.surface.edits(), 0);
    assert_eq!(h.surface.deletes(), 0);
    assert_eq!(h.surface.processed(), vec![(31, None)]);
}

#[tokio::test]
async fn stream_error_midway_fails_without_fallback() {
    let h = Harness::new(
        settings(),
        FakeTransport::serving(vec![9u8; 3000]).breaking_after(1),
        FakeFallback::serving(vec![9u8; 3000]),
    );

    let result = h
        .router
        .ingestor()
        .ingest(&message(32, "alice").with_attachment(document(3000)))
        .await;

    assert!(matches!(result.error, Some(IngestError::Transport(_))));
    assert!(result.content_ref.contains(FILE_ERROR_MARKER));
    assert!(h.fallback.calls().is_empty());
    assert!(h.vault.file_paths().await.is_empty());

    // the indicator was posted, advanced once and still removed
    assert_eq!(h.surface.replies().len(), 1);
    assert_eq!(h.surface.edits(), 1);
    assert_eq!(h.surface.deletes(), 1);

    let processed = h.surface.processed();
    assert_eq!(processed.len(), 1);
    assert!(matches!(processed[0].1, Some(IngestError::Transport(_))));
}

#[tokio::test]
async fn concurrent_identical_texts_get_distinct_notes() {
    let h = Harness::text_only(settings());
    let count = 16;

    let routes = (0..count).map(|i| {
        h.router
            .route(message(100 + i, "alice").with_text("meeting notes"))
    });
    futures::future::join_all(routes).await;

    let paths = h.vault.file_paths().await;
    assert_eq!(paths.len(), count as usize);
    let mut unique = paths.clone();
    unique.dedup();
    assert_eq!(unique.len(), count as usize);
    for path in &paths {
        assert!(path.starts_with("Telegram/meeting notes - "));
    }
    assert_eq!(h.state.paths.len().await, count as usize);
    assert_eq!(h.surface.processed().len(), count as usize);
}
