use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use chainrelay::aggregator::refresher::SnapshotRefresher;
use chainrelay::aggregator::{MetricAggregator, SnapshotService};
use chainrelay::api::{ApiState, create_router};
use chainrelay::cache::durable::{DurableStore, FsStore};
use chainrelay::cache::snapshot_cache_key;
use chainrelay::cache::tiered::TieredCache;
use chainrelay::config::{AppConfig, DurableStoreConfig};
use chainrelay::observability;
use chainrelay::rpc::{RaceRouter, RpcEndpoint};
use chainrelay::utils::task_supervisor::TaskSupervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::tracing::init();
    observability::metrics::register_metrics();

    let env = std::env::var("CHAINRELAY_ENV").unwrap_or_else(|_| "default".to_string());
    let config = AppConfig::load(&env).unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, falling back to built-in defaults");
        AppConfig::default()
    });

    let endpoints: Vec<RpcEndpoint> = config
        .gateway
        .endpoints
        .iter()
        .map(|url| RpcEndpoint { url: url.clone() })
        .collect();
    anyhow::ensure!(!endpoints.is_empty(), "at least one upstream endpoint is required");

    let router = Arc::new(RaceRouter::new(
        endpoints,
        Duration::from_millis(config.gateway.attempt_timeout_ms),
    ));

    let durable: Option<Arc<dyn DurableStore>> = config.cache.durable.as_ref().map(|store| {
        match store {
            DurableStoreConfig::Filesystem { dir } => {
                Arc::new(FsStore::new(dir.clone())) as Arc<dyn DurableStore>
            }
        }
    });
    let ttl = Duration::from_millis(config.cache.ttl_ms);
    let cache = TieredCache::new(durable, ttl);

    let key = snapshot_cache_key(config.sources.chain_id, &config.sources.sources);
    let aggregator = MetricAggregator::new(
        router.clone(),
        config.sources.chain_id,
        config.sources.sources.clone(),
    );
    let service = Arc::new(SnapshotService::new(cache, aggregator, key));

    let mut supervisor = TaskSupervisor::new();
    let refresher = SnapshotRefresher::new(service.clone(), ttl);
    supervisor.spawn("snapshot_refresh", async move { refresher.run().await });

    let state = Arc::new(ApiState {
        router,
        snapshots: service,
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!(listen_addr = %config.server.listen_addr, "chainrelay listening");

    let serve = std::future::IntoFuture::into_future(axum::serve(listener, app));
    tokio::pin!(serve);
    let mut health_ticker = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            result = &mut serve => {
                result?;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            _ = health_ticker.tick() => {
                if let Err(e) = supervisor.check_health() {
                    warn!(error = %e, "background task failure detected");
                }
            }
        }
    }

    supervisor.shutdown_all();
    Ok(())
}
