use serde::{Deserialize, Serialize};

use crate::cache::tiered::DEFAULT_TTL_MS;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CacheConfig {
    /// One TTL for every tier. Couples to the refresh cadence of the
    /// underlying data: at most one live computation per key per window.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Durable tier binding, selected once at startup. Absent means the
    /// cache runs with the memory tier and live recomputation only.
    #[serde(default)]
    pub durable: Option<DurableStoreConfig>,
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL_MS
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DurableStoreConfig {
    Filesystem { dir: String },
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_ms: DEFAULT_TTL_MS,
            durable: Some(DurableStoreConfig::Filesystem {
                dir: "data/cache".to_string(),
            }),
        }
    }
}
