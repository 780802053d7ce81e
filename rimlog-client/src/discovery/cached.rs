use super::Discovery;
use crate::error::Result;
use crate::types::ServerDescriptor;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct TopologySnapshot {
    servers: Vec<ServerDescriptor>,
    fetched_at: Instant,
}

/// Reuses a discovered topology until it is older than `ttl`.
///
/// Refreshes are single-flight: concurrent callers that find the snapshot
/// stale wait for one discovery round trip instead of issuing their own.
/// A failed refresh is returned to the caller; a stale snapshot is never
/// served in its place. A refresh that overlaps an [`invalidate`] still
/// answers its callers but is not cached.
///
/// [`invalidate`]: Discovery::invalidate
pub struct CachedDiscovery {
    inner: Arc<dyn Discovery>,
    ttl: Duration,
    snapshot: RwLock<Option<TopologySnapshot>>,
    refresh: Mutex<()>,
    // Bumped by every invalidate.
    generation: AtomicU64,
}

impl CachedDiscovery {
    pub fn new(inner: Arc<dyn Discovery>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            snapshot: RwLock::new(None),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh_servers(&self) -> Option<Vec<ServerDescriptor>> {
        let guard = self
            .snapshot
            .read()
            .expect("topology snapshot lock poisoned");

        guard
            .as_ref()
            .filter(|snapshot| snapshot.fetched_at.elapsed() < self.ttl)
            .map(|snapshot| snapshot.servers.clone())
    }
}

#[async_trait]
impl Discovery for CachedDiscovery {
    async fn discover_servers(&self) -> Result<Vec<ServerDescriptor>> {
        if let Some(servers) = self.fresh_servers() {
            return Ok(servers);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(servers) = self.fresh_servers() {
            return Ok(servers);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let servers = self.inner.discover_servers().await?;

        let mut guard = self
            .snapshot
            .write()
            .expect("topology snapshot lock poisoned");
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(
                "topology invalidated during refresh, not caching {} data servers",
                servers.len()
            );
            return Ok(servers);
        }

        tracing::debug!("refreshed topology: {} data servers", servers.len());
        *guard = Some(TopologySnapshot {
            servers: servers.clone(),
            fetched_at: Instant::now(),
        });

        Ok(servers)
    }

    fn invalidate(&self) {
        let mut guard = self
            .snapshot
            .write()
            .expect("topology snapshot lock poisoned");
        self.generation.fetch_add(1, Ordering::AcqRel);
        *guard = None;
        drop(guard);
        self.inner.invalidate();
    }
}
