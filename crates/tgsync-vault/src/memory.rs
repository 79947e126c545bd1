use crate::error::{Result, VaultError};
use crate::naming::normalize_path;
use crate::store::Vault;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Contents {
    folders: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

/// In-process vault; files live in a map keyed by normalized path
#[derive(Debug, Default)]
pub struct MemoryVault {
    contents: Mutex<Contents>,
    read_only: AtomicBool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`VaultError::ReadOnly`]
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Seed a file without going through the create-only path
    pub async fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.contents
            .lock()
            .await
            .files
            .insert(normalize_path(path), bytes.into());
    }

    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.contents
            .lock()
            .await
            .files
            .get(&normalize_path(path))
            .cloned()
    }

    /// All file paths, sorted
    pub async fn file_paths(&self) -> Vec<String> {
        self.contents.lock().await.files.keys().cloned().collect()
    }

    pub async fn has_folder(&self, path: &str) -> bool {
        self.contents
            .lock()
            .await
            .folders
            .contains(&normalize_path(path))
    }

    async fn create(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(VaultError::ReadOnly);
        }
        let key = normalize_path(path);
        let mut contents = self.contents.lock().await;
        if contents.files.contains_key(&key) {
            return Err(VaultError::AlreadyExists(key));
        }
        contents.files.insert(key, bytes);
        Ok(())
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn ensure_folder(&self, path: &str) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(VaultError::ReadOnly);
        }
        self.contents.lock().await.folders.insert(normalize_path(path));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .contents
            .lock()
            .await
            .files
            .contains_key(&normalize_path(path)))
    }

    async fn create_text(&self, path: &str, content: &str) -> Result<()> {
        self.create(path, content.as_bytes().to_vec()).await
    }

    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.create(path, bytes.to_vec()).await
    }

    async fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self
            .file(path)
            .await
            .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
