use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::Instrument;

use crate::aggregator::SnapshotService;
use crate::observability::tracing::trace_snapshot_refresh;

/// Background refresh loop: one tick per TTL window keeps the cached
/// snapshot warm so interactive reads almost always hit the memory tier.
pub struct SnapshotRefresher {
    service: Arc<SnapshotService>,
    interval: Duration,
}

impl SnapshotRefresher {
    pub fn new(service: Arc<SnapshotService>, interval: Duration) -> Self {
        SnapshotRefresher { service, interval }
    }

    pub async fn run(&self) {
        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            let (snapshot, tier) = self
                .service
                .get(false)
                .instrument(trace_snapshot_refresh())
                .await;
            tracing::info!(
                served_from = ?tier,
                block_number = snapshot.block_number,
                degraded = snapshot.degraded_count(),
                "snapshot refreshed"
            );
        }
    }
}
