use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AttemptError, Error, Result};

/// Outbound JSON-RPC 2.0 call. Ids are assigned by the caller so that batch
/// sub-results can be matched back to their sub-calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Validate a caller-supplied payload before it is raced upstream.
/// Accepted shapes: a JSON object carrying a string `method`, or a non-empty
/// array of such objects. Anything else is a client error, never retried.
pub fn validate_client_payload(payload: &Value) -> Result<()> {
    match payload {
        Value::Object(_) => validate_call(payload),
        Value::Array(calls) => {
            if calls.is_empty() {
                return Err(Error::MalformedRequest("empty batch".to_string()));
            }
            for call in calls {
                validate_call(call)?;
            }
            Ok(())
        }
        _ => Err(Error::MalformedRequest(
            "payload must be a JSON-RPC request object or batch array".to_string(),
        )),
    }
}

fn validate_call(call: &Value) -> Result<()> {
    let obj = call
        .as_object()
        .ok_or_else(|| Error::MalformedRequest("batch element is not an object".to_string()))?;
    match obj.get("method") {
        Some(Value::String(_)) => Ok(()),
        _ => Err(Error::MalformedRequest(
            "request is missing a string `method`".to_string(),
        )),
    }
}

/// Classify one endpoint's response body.
///
/// A body is a failure if it is not JSON, or the envelope (or any element of
/// a batch envelope) carries an `error` member. A syntactically valid
/// `result` is a success even when it is `null` or zero — JSON-RPC-level
/// errors hide behind HTTP 200, so status checks alone are not enough.
pub fn classify_body(body: &[u8]) -> std::result::Result<(), AttemptError> {
    let parsed: Value = serde_json::from_slice(body).map_err(|_| AttemptError::InvalidJson)?;
    match &parsed {
        Value::Object(_) => classify_envelope(&parsed),
        Value::Array(elements) => {
            if elements.is_empty() {
                return Err(AttemptError::InvalidJson);
            }
            for element in elements {
                classify_envelope(element)?;
            }
            Ok(())
        }
        _ => Err(AttemptError::InvalidJson),
    }
}

fn classify_envelope(envelope: &Value) -> std::result::Result<(), AttemptError> {
    let obj = envelope.as_object().ok_or(AttemptError::InvalidJson)?;
    if let Some(error) = obj.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(AttemptError::RpcError(message));
    }
    Ok(())
}
