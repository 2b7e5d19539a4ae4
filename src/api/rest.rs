use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::aggregator::SnapshotService;
use crate::aggregator::snapshot::Snapshot;
use crate::api::insight::insight;
use crate::cache::CacheTier;
use crate::observability::metrics;
use crate::rpc::RaceRouter;
use crate::rpc::envelope::validate_client_payload;

pub struct ApiState {
    pub router: Arc<RaceRouter>,
    pub snapshots: Arc<SnapshotService>,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/rpc", post(proxy_rpc))
        .route("/snapshot", get(get_snapshot))
        .route("/insight", post(insight))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
        .into_response()
}

/// Race the caller's payload across every upstream and relay the winner's
/// raw body. Diagnostic headers identify the winning endpoint and how long
/// the race took.
async fn proxy_rpc(State(state): State<Arc<ApiState>>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return rpc_error(StatusCode::BAD_REQUEST, -32700, "parse error"),
    };
    if let Err(e) = validate_client_payload(&payload) {
        tracing::debug!(error = %e, "rejected malformed client payload");
        return rpc_error(StatusCode::BAD_REQUEST, -32600, "invalid request");
    }

    let race = state
        .router
        .race(&payload)
        .instrument(crate::observability::tracing::trace_race(
            state.router.endpoint_count(),
        ));
    match race.await {
        Ok(winner) => {
            let mut response = (StatusCode::OK, winner.body).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            if let Ok(upstream) = HeaderValue::from_str(&winner.endpoint_url) {
                headers.insert("x-upstream", upstream);
            }
            headers.insert(
                "x-race-elapsed-ms",
                HeaderValue::from(winner.elapsed.as_millis() as u64),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "race failed on every endpoint");
            rpc_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                -32603,
                "all upstream endpoints failed",
            )
        }
    }
}

fn rpc_error(status: StatusCode, code: i64, message: &str) -> Response {
    let envelope = json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": { "code": code, "message": message },
    });
    (status, Json(envelope)).into_response()
}

#[derive(serde::Deserialize)]
struct SnapshotQuery {
    #[serde(default)]
    force: u8,
}

#[derive(serde::Serialize)]
struct SnapshotResponse {
    served_from: CacheTier,
    snapshot: Snapshot,
}

async fn get_snapshot(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SnapshotQuery>,
) -> Json<SnapshotResponse> {
    let (snapshot, served_from) = state.snapshots.get(query.force == 1).await;
    Json(SnapshotResponse {
        served_from,
        snapshot,
    })
}
