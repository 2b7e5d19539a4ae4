use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::aggregator::snapshot::Snapshot;
use crate::cache::durable::DurableStore;
use crate::cache::memory::MemoryTier;
use crate::cache::{CacheEntry, CacheTier};
use crate::observability::metrics;
use crate::utils::helper::current_timestamp_ms;

pub const DEFAULT_TTL_MS: u64 = 30_000;

/// Memory → durable store → live recomputation lookaside chain.
///
/// The TTL couples to the refresh cadence of the underlying data: at most
/// one live recomputation per key per TTL window, independent of request
/// volume. Durable-tier failures are absorbed as misses; the memory tier and
/// live recomputation are the correctness backstop.
pub struct TieredCache {
    memory: MemoryTier,
    durable: Option<Arc<dyn DurableStore>>,
    ttl: Duration,
    // Serializes the miss path so concurrent readers cannot stampede the
    // live tier. A double-checked memory re-read under the lock lets the
    // losers of the lock race reuse the winner's snapshot.
    compute_lock: Mutex<()>,
}

impl TieredCache {
    pub fn new(durable: Option<Arc<dyn DurableStore>>, ttl: Duration) -> Self {
        TieredCache {
            memory: MemoryTier::new(),
            durable,
            ttl,
            compute_lock: Mutex::new(()),
        }
    }

    /// Walk the tiers for `key`. `force` skips tiers 1–2 entirely and always
    /// recomputes (still writing the result through). `compute` is invoked
    /// only on a full miss; it is infallible because the aggregator absorbs
    /// its own failures into a degraded snapshot.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        force: bool,
        compute: F,
    ) -> (Snapshot, CacheTier)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Snapshot>,
    {
        if !force {
            let now = current_timestamp_ms();
            if let Some(entry) = self.memory.get(key, now) {
                metrics::CACHE_HITS_MEMORY.inc();
                return (entry.snapshot, CacheTier::Memory);
            }
            if let Some(entry) = self.durable_get(key, now).await {
                metrics::CACHE_HITS_DURABLE.inc();
                // Promote with a full TTL restart to absorb subsequent reads.
                self.memory.put(
                    key,
                    CacheEntry {
                        snapshot: entry.snapshot.clone(),
                        expires_at_ms: now + self.ttl.as_millis() as u64,
                    },
                );
                return (entry.snapshot, CacheTier::Durable);
            }
        }

        let _guard = self.compute_lock.lock().await;
        if !force {
            let now = current_timestamp_ms();
            if let Some(entry) = self.memory.get(key, now) {
                metrics::CACHE_HITS_MEMORY.inc();
                return (entry.snapshot, CacheTier::Memory);
            }
        }

        metrics::LIVE_COMPUTES.inc();
        let snapshot = compute().await;

        let entry = CacheEntry {
            snapshot: snapshot.clone(),
            expires_at_ms: current_timestamp_ms() + self.ttl.as_millis() as u64,
        };
        self.memory.put(key, entry.clone());
        self.durable_put(key, &entry).await;

        (snapshot, CacheTier::Live)
    }

    /// Durable read with the entry's embedded expiry as the authority.
    /// Any store or decode failure is treated as a miss.
    async fn durable_get(&self, key: &str, now_ms: u64) -> Option<CacheEntry> {
        let store = self.durable.as_ref()?;
        let bytes = match store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "durable tier read failed, treating as miss");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "durable tier entry undecodable, treating as miss");
                return None;
            }
        };
        if entry.is_fresh(now_ms) {
            Some(entry)
        } else {
            debug!(key, "durable tier entry expired");
            None
        }
    }

    async fn durable_put(&self, key: &str, entry: &CacheEntry) {
        let Some(store) = self.durable.as_ref() else {
            return;
        };
        let bytes = match serde_json::to_vec(entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "cache entry serialization failed, skipping durable write");
                return;
            }
        };
        if let Err(e) = store.put(key, &bytes, self.ttl).await {
            warn!(key, error = %e, "durable tier write failed, continuing without it");
        }
    }
}
