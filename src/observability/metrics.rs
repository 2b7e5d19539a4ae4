use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, HistogramOpts, IntGauge, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Race metrics
    pub static ref RACES_WON: Counter = Counter::new(
        "races_won_total",
        "Total number of races resolved with a winning endpoint"
    ).unwrap();

    pub static ref RACES_FAILED: Counter = Counter::new(
        "races_failed_total",
        "Total number of races where every endpoint failed"
    ).unwrap();

    pub static ref RACE_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "race_latency_seconds",
            "Latency of the winning race attempt"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 4.0])
    ).unwrap();

    // Cache metrics
    pub static ref CACHE_HITS_MEMORY: Counter = Counter::new(
        "cache_hits_memory_total",
        "Snapshot reads served by the memory tier"
    ).unwrap();

    pub static ref CACHE_HITS_DURABLE: Counter = Counter::new(
        "cache_hits_durable_total",
        "Snapshot reads served by the durable tier"
    ).unwrap();

    pub static ref LIVE_COMPUTES: Counter = Counter::new(
        "live_computes_total",
        "Snapshot reads that fell through to live recomputation"
    ).unwrap();

    // Aggregator metrics
    pub static ref DEGRADED_SOURCES: IntGauge = IntGauge::new(
        "degraded_sources",
        "Number of sources degraded in the latest snapshot"
    ).unwrap();
}

pub fn register_metrics() {
    // Re-registration returns AlreadyReg; ignored so init stays idempotent.
    let _ = REGISTRY.register(Box::new(RACES_WON.clone()));
    let _ = REGISTRY.register(Box::new(RACES_FAILED.clone()));
    let _ = REGISTRY.register(Box::new(RACE_LATENCY.clone()));
    let _ = REGISTRY.register(Box::new(CACHE_HITS_MEMORY.clone()));
    let _ = REGISTRY.register(Box::new(CACHE_HITS_DURABLE.clone()));
    let _ = REGISTRY.register(Box::new(LIVE_COMPUTES.clone()));
    let _ = REGISTRY.register(Box::new(DEGRADED_SOURCES.clone()));
}

pub fn render() -> String {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_default()
}
