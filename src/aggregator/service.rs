use std::sync::RwLock;

use crate::aggregator::MetricAggregator;
use crate::aggregator::snapshot::Snapshot;
use crate::cache::CacheTier;
use crate::cache::tiered::TieredCache;

/// Ties the cache and the aggregator together under one key and retains the
/// single previous snapshot. The previous snapshot seeds delta computation
/// and supplies preserved values under partial failure; no deeper history is
/// kept.
pub struct SnapshotService {
    cache: TieredCache,
    aggregator: MetricAggregator,
    key: String,
    last: RwLock<Option<Snapshot>>,
}

impl SnapshotService {
    pub fn new(cache: TieredCache, aggregator: MetricAggregator, key: String) -> Self {
        SnapshotService {
            cache,
            aggregator,
            key,
            last: RwLock::new(None),
        }
    }

    /// Tiered read; `force` busts tiers 1–2 and recomputes live.
    pub async fn get(&self, force: bool) -> (Snapshot, CacheTier) {
        let (snapshot, tier) = self
            .cache
            .get_or_compute(&self.key, force, || async {
                let previous = self.current();
                self.aggregator.compute_snapshot(previous.as_ref()).await
            })
            .await;

        if let Ok(mut last) = self.last.write() {
            *last = Some(snapshot.clone());
        }
        (snapshot, tier)
    }

    /// Synchronous accessor for collaborators that cannot await a tier walk,
    /// such as the insight report formatter.
    pub fn current(&self) -> Option<Snapshot> {
        self.last.read().ok().and_then(|guard| (*guard).clone())
    }
}
