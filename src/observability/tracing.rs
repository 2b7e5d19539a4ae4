use tracing::Span;
use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chainrelay=info,tower_http=info"));

    // Init fails if a subscriber is already set (tests); that is fine.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn trace_race(endpoint_count: usize) -> Span {
    tracing::info_span!("rpc_race", endpoints = endpoint_count)
}

pub fn trace_snapshot_refresh() -> Span {
    tracing::info_span!("snapshot_refresh")
}
