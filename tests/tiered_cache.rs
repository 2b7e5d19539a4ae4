use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chainrelay::aggregator::snapshot::{Snapshot, SourceHealth, SourceMetric};
use chainrelay::cache::durable::{DurableStore, FsStore};
use chainrelay::cache::tiered::TieredCache;
use chainrelay::cache::{CacheEntry, CacheTier};
use chainrelay::error::{Error, Result};
use chainrelay::utils::helper::current_timestamp_ms;

const TTL: Duration = Duration::from_secs(30);
const KEY: &str = "snapshot:test";

mockall::mock! {
    Store {}

    #[async_trait::async_trait]
    impl DurableStore for Store {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
        async fn put(&self, key: &str, bytes: &[u8], ttl: Duration) -> Result<()>;
    }
}

fn sample_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::empty(1);
    snapshot.block_number = Some(18_000_000);
    snapshot.sources.insert(
        "USDC".to_string(),
        SourceMetric {
            primary_value: 25_000_000_000.0,
            flow_proxy: 12.5,
            health: SourceHealth::Ok,
            note: String::new(),
        },
    );
    snapshot
}

/// Compute closure that counts invocations.
fn counting_compute(
    counter: Arc<AtomicUsize>,
    snapshot: Snapshot,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = Snapshot> + Send>> {
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let snapshot = snapshot.clone();
        Box::pin(async move { snapshot })
    }
}

#[tokio::test]
async fn second_read_within_ttl_is_memory_hit_with_one_compute() {
    let cache = TieredCache::new(None, TTL);
    let computes = Arc::new(AtomicUsize::new(0));
    let compute = counting_compute(computes.clone(), sample_snapshot());

    let (first, first_tier) = cache.get_or_compute(KEY, false, &compute).await;
    let (second, second_tier) = cache.get_or_compute(KEY, false, &compute).await;

    assert_eq!(first_tier, CacheTier::Live);
    assert_eq!(second_tier, CacheTier::Memory);
    assert_eq!(computes.load(Ordering::SeqCst), 1);
    // Byte-identical within the TTL window.
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn force_refresh_recomputes_even_when_fresh() {
    let cache = TieredCache::new(None, TTL);
    let computes = Arc::new(AtomicUsize::new(0));
    let compute = counting_compute(computes.clone(), sample_snapshot());

    let (_, first_tier) = cache.get_or_compute(KEY, false, &compute).await;
    let (_, forced_tier) = cache.get_or_compute(KEY, true, &compute).await;

    assert_eq!(first_tier, CacheTier::Live);
    assert_eq!(forced_tier, CacheTier::Live);
    assert_eq!(computes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn durable_roundtrip_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsStore::new(dir.path()));
    let computes = Arc::new(AtomicUsize::new(0));
    let compute = counting_compute(computes.clone(), sample_snapshot());

    // First process: compute and write through.
    let cache = TieredCache::new(Some(store.clone()), TTL);
    let (written, _) = cache.get_or_compute(KEY, false, &compute).await;

    // Restarted process: empty memory tier, same store.
    let restarted = TieredCache::new(Some(store), TTL);
    let (read_back, tier) = restarted.get_or_compute(KEY, false, &compute).await;

    assert_eq!(tier, CacheTier::Durable);
    assert_eq!(computes.load(Ordering::SeqCst), 1);
    assert_eq!(written, read_back);
}

#[tokio::test]
async fn expired_durable_entry_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsStore::new(dir.path()));

    // An entry whose embedded expiry is exactly now must not be served.
    let stale = CacheEntry {
        snapshot: sample_snapshot(),
        expires_at_ms: current_timestamp_ms(),
    };
    store
        .put(KEY, &serde_json::to_vec(&stale).unwrap(), TTL)
        .await
        .unwrap();

    let cache = TieredCache::new(Some(store), TTL);
    let computes = Arc::new(AtomicUsize::new(0));
    let compute = counting_compute(computes.clone(), sample_snapshot());

    let (_, tier) = cache.get_or_compute(KEY, false, &compute).await;

    assert_eq!(tier, CacheTier::Live);
    assert_eq!(computes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn durable_hit_promotes_into_memory() {
    let entry = CacheEntry {
        snapshot: sample_snapshot(),
        expires_at_ms: current_timestamp_ms() + TTL.as_millis() as u64,
    };
    let bytes = serde_json::to_vec(&entry).unwrap();

    let mut store = MockStore::new();
    // The store is consulted exactly once; the promotion absorbs the rest.
    store
        .expect_get()
        .times(1)
        .returning(move |_| Ok(Some(bytes.clone())));
    store.expect_put().never();

    let cache = TieredCache::new(Some(Arc::new(store)), TTL);
    let computes = Arc::new(AtomicUsize::new(0));
    let compute = counting_compute(computes.clone(), sample_snapshot());

    let (_, first_tier) = cache.get_or_compute(KEY, false, &compute).await;
    let (_, second_tier) = cache.get_or_compute(KEY, false, &compute).await;

    assert_eq!(first_tier, CacheTier::Durable);
    assert_eq!(second_tier, CacheTier::Memory);
    assert_eq!(computes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn durable_failures_are_absorbed_as_misses() {
    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|_| Err(Error::DurableTierUnavailable("kv offline".to_string())));
    store
        .expect_put()
        .returning(|_, _, _| Err(Error::DurableTierUnavailable("kv offline".to_string())));

    let cache = TieredCache::new(Some(Arc::new(store)), TTL);
    let computes = Arc::new(AtomicUsize::new(0));
    let compute = counting_compute(computes.clone(), sample_snapshot());

    // The caller still gets a snapshot; the broken store never surfaces.
    let (snapshot, tier) = cache.get_or_compute(KEY, false, &compute).await;

    assert_eq!(tier, CacheTier::Live);
    assert_eq!(snapshot, sample_snapshot());
}
