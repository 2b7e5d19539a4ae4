pub mod cache;
pub mod gateway;
pub mod loader;
pub mod server;
pub mod sources;

pub use cache::{CacheConfig, DurableStoreConfig};
pub use gateway::GatewayConfig;
pub use loader::AppConfig;
pub use server::ServerConfig;
pub use sources::{SourceConfig, SourcesConfig};
