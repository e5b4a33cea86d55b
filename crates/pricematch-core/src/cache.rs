use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use crate::catalog::CatalogItem;
use crate::servicetitan::ClientResult;

/// Anything that can produce a full pricebook listing.
#[async_trait::async_trait]
pub trait PricebookSource: Send + Sync {
    async fn fetch_catalog(&self) -> ClientResult<Vec<CatalogItem>>;
}

/// An immutable catalog listing and when it was fetched.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub items: Vec<CatalogItem>,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new(items: Vec<CatalogItem>, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            items,
            fetched_at,
            ttl,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match TimeDelta::from_std(self.ttl) {
            Ok(ttl) => now.signed_duration_since(self.fetched_at) < ttl,
            Err(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Time-bounded catalog cache.
///
/// A refresh builds a complete snapshot and then swaps the `Arc`, so a match
/// pass holding the previous snapshot never sees a partial update.
pub struct CatalogCache {
    ttl: Duration,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached snapshot, fresh or not, without fetching.
    pub async fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().await.clone()
    }

    pub async fn snapshot<S>(&self, source: &S) -> ClientResult<Arc<CatalogSnapshot>>
    where
        S: PricebookSource + ?Sized,
    {
        self.snapshot_at(source, Utc::now()).await
    }

    /// Return the snapshot if fresh at `now`, otherwise refresh from `source`.
    /// A failed refresh falls back to the stale snapshot when there is one.
    pub async fn snapshot_at<S>(
        &self,
        source: &S,
        now: DateTime<Utc>,
    ) -> ClientResult<Arc<CatalogSnapshot>>
    where
        S: PricebookSource + ?Sized,
    {
        if let Some(snapshot) = self.current().await.filter(|s| s.is_fresh(now)) {
            return Ok(snapshot);
        }

        let mut slot = self.current.write().await;
        // another caller may have refreshed while we waited for the lock
        if let Some(snapshot) = slot.as_ref().filter(|s| s.is_fresh(now)) {
            return Ok(Arc::clone(snapshot));
        }

        match source.fetch_catalog().await {
            Ok(items) => {
                tracing::info!("Cached {} catalog items", items.len());
                let snapshot = Arc::new(CatalogSnapshot::new(items, now, self.ttl));
                *slot = Some(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(e) => match slot.as_ref() {
                Some(stale) => {
                    tracing::warn!(
                        "Catalog refresh failed, serving snapshot from {}: {}",
                        stale.fetched_at,
                        e
                    );
                    Ok(Arc::clone(stale))
                }
                None => Err(e),
            },
        }
    }

    /// Install a listing directly, bypassing any source.
    pub async fn replace(&self, items: Vec<CatalogItem>) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(CatalogSnapshot::new(items, Utc::now(), self.ttl));
        *self.current.write().await = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}
