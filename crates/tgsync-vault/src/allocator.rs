//! Collision-free path allocation
//!
//! A path is claimed in the process-wide [`AllocatedPaths`] index before
//! anything is written to it, so two messages that want the same name in the
//! same second never both get it, even if one of the writes later fails.
//! Claims are never released; after a restart the vault existence probe is
//! the only duplicate check.

use crate::error::Result;
use crate::naming::{date_string, dated_file_name, join, time_string};
use crate::store::Vault;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Wait before re-sampling the clock when it has not moved to the next second
const RESAMPLE_DELAY: Duration = Duration::from_millis(100);

/// Source of "now" for timestamp re-sampling
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Process-wide set of vault paths already handed out
#[derive(Debug, Clone, Default)]
pub struct AllocatedPaths {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl AllocatedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.inner.lock().await.contains(path)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Hands out unique `{folder}/{base} - {date}{time}{ext}` paths
#[derive(Clone)]
pub struct PathAllocator {
    vault: Arc<dyn Vault>,
    index: AllocatedPaths,
    clock: Arc<dyn Clock>,
}

impl PathAllocator {
    pub fn new(vault: Arc<dyn Vault>, index: AllocatedPaths) -> Self {
        Self {
            vault,
            index,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used when a candidate is taken
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn index(&self) -> &AllocatedPaths {
        &self.index
    }

    /// Allocate a path for `base` dated `date`. `extension` includes its dot.
    ///
    /// The date part always comes from `date`; when a candidate is taken the
    /// time part is re-sampled from the clock until a free one is found.
    /// The whole probe-and-claim runs under the index lock.
    pub async fn allocate(
        &self,
        folder: &str,
        base: &str,
        date: DateTime<Utc>,
        extension: &str,
    ) -> Result<String> {
        let mut claimed = self.index.inner.lock().await;

        let day = date_string(date);
        let mut time = time_string(date);
        loop {
            let candidate = join(folder, &dated_file_name(base, &day, &time, extension));
            if !claimed.contains(&candidate) && !self.vault.exists(&candidate).await? {
                claimed.insert(candidate.clone());
                debug!(path = %candidate, "Vault path allocated");
                return Ok(candidate);
            }

            debug!(path = %candidate, "Vault path taken, re-sampling time");
            let mut next = time_string(self.clock.now());
            while next == time {
                tokio::time::sleep(RESAMPLE_DELAY).await;
                next = time_string(self.clock.now());
            }
            time = next;
        }
    }
}
