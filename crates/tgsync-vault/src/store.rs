use crate::error::{Result, VaultError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Document store addressed by vault-relative paths
#[async_trait]
pub trait Vault: Send + Sync {
    /// Create the folder and its parents; succeeds if it already exists
    async fn ensure_folder(&self, path: &str) -> Result<()>;

    /// Whether a file exists at `path`
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create a new text file. Fails with [`VaultError::AlreadyExists`] if taken.
    async fn create_text(&self, path: &str, content: &str) -> Result<()>;

    /// Create a new binary file. Fails with [`VaultError::AlreadyExists`] if taken.
    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<()>;

    async fn read_text(&self, path: &str) -> Result<String>;
}

/// Vault backed by a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Vault rooted at {}", root.display());
        Self { root }
    }

    /// Map a vault path onto the filesystem, refusing anything that could escape the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(VaultError::InvalidPath {
                        path: path.to_string(),
                        reason: "only relative paths inside the vault are allowed".to_string(),
                    })
                }
            }
        }
        Ok(self.root.join(relative))
    }

    async fn create_new(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        let io_err = |source| VaultError::Io {
            path: path.to_string(),
            source,
        };

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(VaultError::AlreadyExists(path.to_string()))
            }
            Err(e) => return Err(io_err(e)),
        };
        file.write_all(bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        debug!(path, bytes = bytes.len(), "Vault file created");
        Ok(())
    }
}

#[async_trait]
impl Vault for FsVault {
    async fn ensure_folder(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        fs::create_dir_all(&target)
            .await
            .map_err(|source| VaultError::Io {
                path: path.to_string(),
                source,
            })
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        match fs::metadata(&target).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(VaultError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn create_text(&self, path: &str, content: &str) -> Result<()> {
        self.create_new(path, content.as_bytes()).await
    }

    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.create_new(path, bytes).await
    }

    async fn read_text(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        match fs::read_to_string(&target).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(path.to_string()))
            }
            Err(source) => Err(VaultError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}
