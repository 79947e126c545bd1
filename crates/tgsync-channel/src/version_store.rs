use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tgsync_ingest::VersionStore;
use tgsync_persistence::PersistenceService;

/// Version marker kept in the settings table
#[derive(Clone)]
pub struct SqliteVersionStore(Arc<PersistenceService>);

impl SqliteVersionStore {
    pub fn new(persistence: Arc<PersistenceService>) -> Self {
        Self(persistence)
    }
}

#[async_trait]
impl VersionStore for SqliteVersionStore {
    async fn load(&self) -> Result<Option<String>> {
        self.0.load_version_marker().await
    }

    async fn save(&self, version: &str) -> Result<()> {
        self.0.save_version_marker(version).await
    }
}
