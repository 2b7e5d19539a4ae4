pub mod durable;
pub mod memory;
pub mod tiered;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aggregator::snapshot::Snapshot;
use crate::config::sources::SourceConfig;

/// Which tier satisfied a read. Reported back to callers so cache behavior
/// stays observable from the outside.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Memory,
    Durable,
    Live,
}

/// One cached snapshot with its own embedded expiry. The embedded timestamp
/// is authoritative in every tier; a durable store's native TTL is only a
/// hint for garbage collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub snapshot: Snapshot,
    pub expires_at_ms: u64,
}

impl CacheEntry {
    /// Exclusive boundary: an entry read exactly at its expiry is stale.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Deterministic fingerprint of a snapshot query: chain id plus the sorted
/// (address, selector) pairs of the source table. Listing order of the
/// sources does not affect the key.
pub fn snapshot_cache_key(chain_id: u64, sources: &[SourceConfig]) -> String {
    let mut pairs: Vec<String> = sources
        .iter()
        .map(|s| format!("{}:{}", s.address.to_lowercase(), s.selector.to_lowercase()))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(chain_id.to_be_bytes());
    for pair in &pairs {
        hasher.update(pair.as_bytes());
    }
    let digest = hasher.finalize();
    format!("snapshot:{}", hex::encode(&digest[..16]))
}
