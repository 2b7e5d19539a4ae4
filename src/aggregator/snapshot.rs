use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// One aggregator run's output. The schema is stable regardless of upstream
/// availability: every configured source always has an entry, degraded
/// sources are reported with a note, never omitted.
///
/// Sources live in a BTreeMap so serialization is deterministic — two reads
/// of the same cached snapshot are byte-identical.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub schema_version: u32,
    pub updated_at: DateTime<Utc>,
    pub chain_id: u64,
    pub block_number: Option<u64>,
    pub sources: BTreeMap<String, SourceMetric>,
}

impl Snapshot {
    pub fn empty(chain_id: u64) -> Self {
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            chain_id,
            block_number: None,
            sources: BTreeMap::new(),
        }
    }

    pub fn degraded_count(&self) -> usize {
        self.sources
            .values()
            .filter(|m| m.health == SourceHealth::Degraded)
            .count()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SourceMetric {
    /// Decoded on-chain value scaled to display units.
    pub primary_value: f64,
    /// Momentum proxy: |Δ primary_value| × the source's configured weight.
    /// A heuristic for how much the value moved between refreshes — not a
    /// measured volume figure and never presented as one.
    pub flow_proxy: f64,
    pub health: SourceHealth,
    pub note: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceHealth {
    Ok,
    Degraded,
}
