use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;

use crate::aggregator::snapshot::{Snapshot, SourceHealth};
use crate::api::rest::ApiState;

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub messages: Vec<ChatMessage>,
}

/// Answer the latest user message with a plain-text report over the current
/// snapshot, streamed line by line.
pub async fn insight(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<InsightRequest>,
) -> Result<Response, StatusCode> {
    let question = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let snapshot = state.snapshots.current();
    let report = render_report(&question, snapshot.as_ref());

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, Infallible>>(16);
    tokio::spawn(async move {
        for line in report {
            if tx.send(Ok(line)).await.is_err() {
                break; // client went away
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

/// Deterministic report formatter: same question and snapshot always yield
/// the same lines.
fn render_report(question: &str, snapshot: Option<&Snapshot>) -> Vec<String> {
    let mut lines = vec![format!("Q: {}\n\n", question)];

    let Some(snapshot) = snapshot else {
        lines.push("No snapshot has been computed yet. Try again shortly.\n".to_string());
        return lines;
    };

    lines.push(format!(
        "Snapshot for chain {} at block {} (updated {}):\n",
        snapshot.chain_id,
        snapshot
            .block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        snapshot.updated_at.to_rfc3339(),
    ));

    for (id, metric) in &snapshot.sources {
        let health = match metric.health {
            SourceHealth::Ok => "ok",
            SourceHealth::Degraded => "degraded",
        };
        let mut line = format!(
            "- {}: value {:.4}, flow proxy {:.4} (heuristic, not measured volume), health {}",
            id, metric.primary_value, metric.flow_proxy, health,
        );
        if !metric.note.is_empty() {
            line.push_str(&format!(" ({})", metric.note));
        }
        line.push('\n');
        lines.push(line);
    }

    if snapshot.degraded_count() > 0 {
        lines.push(format!(
            "\n{} source(s) are degraded; their values carry over from the previous refresh.\n",
            snapshot.degraded_count(),
        ));
    }

    lines
}
