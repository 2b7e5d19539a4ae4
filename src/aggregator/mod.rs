pub mod aggregator;
pub mod decode;
pub mod refresher;
pub mod service;
pub mod snapshot;

pub use aggregator::MetricAggregator;
pub use service::SnapshotService;
