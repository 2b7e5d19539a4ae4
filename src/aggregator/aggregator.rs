use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::aggregator::decode::{decode_block_number, decode_hex_word, scale_to_f64};
use crate::aggregator::snapshot::{SNAPSHOT_SCHEMA_VERSION, Snapshot, SourceHealth, SourceMetric};
use crate::config::sources::SourceConfig;
use crate::observability::metrics;
use crate::rpc::RaceRouter;
use crate::rpc::envelope::RpcRequest;

const BLOCK_NUMBER_ID: u64 = 1;
const FIRST_SOURCE_ID: u64 = 2;

/// Builds one batched multi-call per refresh, races it through the router,
/// and folds the sub-results into a Snapshot. Batching keeps the number of
/// race operations down — every race fans out to every endpoint.
///
/// Failure containment: a total batch failure degrades every source; a
/// missing or undecodable sub-result degrades only its own source. Either
/// way the caller receives a fully formed snapshot, never an error.
pub struct MetricAggregator {
    router: Arc<RaceRouter>,
    chain_id: u64,
    sources: Vec<SourceConfig>,
}

impl MetricAggregator {
    pub fn new(router: Arc<RaceRouter>, chain_id: u64, sources: Vec<SourceConfig>) -> Self {
        let sources: Vec<_> = sources.into_iter().filter(|s| s.enabled).collect();
        MetricAggregator {
            router,
            chain_id,
            sources,
        }
    }

    pub async fn compute_snapshot(&self, previous: Option<&Snapshot>) -> Snapshot {
        let batch = self.build_batch();
        let now = Utc::now();

        match self.router.race(&batch).await {
            Ok(winner) => {
                debug!(
                    endpoint = %winner.endpoint_url,
                    elapsed_ms = winner.elapsed.as_millis() as u64,
                    "batch race won"
                );
                let results = index_by_id(&winner.body);
                let snapshot = self.fold_results(previous, &results, now);
                metrics::DEGRADED_SOURCES.set(snapshot.degraded_count() as i64);
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "batch race failed on every endpoint, degrading all sources");
                let snapshot = self.degraded_snapshot(previous, now, "upstream batch call failed");
                metrics::DEGRADED_SOURCES.set(snapshot.degraded_count() as i64);
                snapshot
            }
        }
    }

    /// One `eth_blockNumber` call plus one `eth_call` per enabled source.
    pub fn build_batch(&self) -> Value {
        let mut calls = vec![RpcRequest::new(BLOCK_NUMBER_ID, "eth_blockNumber", None)];
        for (i, source) in self.sources.iter().enumerate() {
            calls.push(RpcRequest::new(
                FIRST_SOURCE_ID + i as u64,
                "eth_call",
                Some(json!([
                    { "to": source.address, "data": source.selector },
                    "latest",
                ])),
            ));
        }
        json!(calls)
    }

    /// Fold indexed batch results into a snapshot. Pure: same previous
    /// snapshot, same results, and same `now` always yield the same output.
    pub fn fold_results(
        &self,
        previous: Option<&Snapshot>,
        results: &HashMap<u64, Value>,
        now: DateTime<Utc>,
    ) -> Snapshot {
        let block_number = match sub_result(results, BLOCK_NUMBER_ID)
            .and_then(|raw| decode_block_number(&raw).map_err(|e| e.to_string()))
        {
            Ok(block) => Some(block),
            Err(reason) => {
                debug!(reason = %reason, "block number unavailable, keeping previous");
                previous.and_then(|p| p.block_number)
            }
        };

        let mut snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            updated_at: now,
            chain_id: self.chain_id,
            block_number,
            sources: Default::default(),
        };

        for (i, source) in self.sources.iter().enumerate() {
            let id = FIRST_SOURCE_ID + i as u64;
            let previous_metric = previous.and_then(|p| p.sources.get(&source.id));
            let previous_value = previous_metric.map(|m| m.primary_value).unwrap_or(0.0);

            let outcome = sub_result(results, id).and_then(|raw| {
                decode_hex_word(&raw)
                    .map(|value| scale_to_f64(&value, source.decimals))
                    .map_err(|e| e.to_string())
            });

            let metric = match outcome {
                Ok(primary_value) => SourceMetric {
                    primary_value,
                    flow_proxy: (primary_value - previous_value).abs() * source.flow_weight,
                    health: SourceHealth::Ok,
                    note: String::new(),
                },
                Err(reason) => SourceMetric {
                    // No new reading: carry the previous value, report no
                    // movement, and say why.
                    primary_value: previous_value,
                    flow_proxy: 0.0,
                    health: SourceHealth::Degraded,
                    note: reason,
                },
            };
            snapshot.sources.insert(source.id.clone(), metric);
        }

        snapshot
    }

    /// Every source degraded with a shared note; previous primary values and
    /// block number preserved.
    fn degraded_snapshot(
        &self,
        previous: Option<&Snapshot>,
        now: DateTime<Utc>,
        note: &str,
    ) -> Snapshot {
        let mut snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            updated_at: now,
            chain_id: self.chain_id,
            block_number: previous.and_then(|p| p.block_number),
            sources: Default::default(),
        };
        for source in &self.sources {
            let previous_value = previous
                .and_then(|p| p.sources.get(&source.id))
                .map(|m| m.primary_value)
                .unwrap_or(0.0);
            snapshot.sources.insert(
                source.id.clone(),
                SourceMetric {
                    primary_value: previous_value,
                    flow_proxy: 0.0,
                    health: SourceHealth::Degraded,
                    note: note.to_string(),
                },
            );
        }
        snapshot
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id.as_str())
    }
}

/// Index a raced batch response body by sub-call id. A body that is not an
/// array indexes to nothing, which degrades every source downstream.
pub fn index_by_id(body: &[u8]) -> HashMap<u64, Value> {
    let Ok(Value::Array(elements)) = serde_json::from_slice::<Value>(body) else {
        return HashMap::new();
    };
    elements
        .into_iter()
        .filter_map(|element| {
            let id = element.get("id").and_then(Value::as_u64)?;
            Some((id, element))
        })
        .collect()
}

/// Extract one sub-call's `result` string. A missing id, an element-level
/// `error`, or a non-string result is a per-source failure.
fn sub_result(results: &HashMap<u64, Value>, id: u64) -> std::result::Result<String, String> {
    let element = results
        .get(&id)
        .ok_or_else(|| format!("sub-result {} missing from batch response", id))?;
    if let Some(error) = element.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(format!("sub-result {} errored: {}", id, message));
    }
    element
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("sub-result {} is not a hex string", id))
}
