use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AttemptError, EndpointFailure, Error, Result};
use crate::observability::metrics;
use crate::rpc::envelope::classify_body;

pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 4000;

#[derive(Clone, Debug)]
pub struct RpcEndpoint {
    pub url: String,
}

/// The winning attempt of one race: which endpoint answered, the raw bytes it
/// answered with, and how long it took to settle.
#[derive(Debug, Clone)]
pub struct RaceWinner {
    pub endpoint_url: String,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

/// Races one JSON-RPC payload across every configured endpoint and resolves
/// to the first genuinely successful response.
///
/// Selection is two-phase: the first attempt to settle wins outright if it is
/// a success (the common low-latency path); if the fastest settler failed,
/// the race keeps draining in-flight attempts until one succeeds. A
/// fast-to-fail endpoint therefore never causes a spurious overall failure
/// while a slower endpoint still has a valid answer in flight.
///
/// Stateless across invocations; separate races may pick different winners.
pub struct RaceRouter {
    client: Client,
    endpoints: Vec<RpcEndpoint>,
    attempt_timeout: Duration,
}

impl RaceRouter {
    pub fn new(endpoints: Vec<RpcEndpoint>, attempt_timeout: Duration) -> Self {
        RaceRouter {
            // Per-attempt deadlines are enforced around the whole attempt,
            // not via the client, so the client carries no global timeout.
            client: Client::new(),
            endpoints,
            attempt_timeout,
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub async fn race(&self, payload: &Value) -> Result<RaceWinner> {
        self.race_with_cancel(payload, CancellationToken::new()).await
    }

    /// Race with a caller-supplied cancellation signal. Triggering the token
    /// drops every in-flight attempt (reqwest aborts the connection on drop).
    pub async fn race_with_cancel(
        &self,
        payload: &Value,
        cancel: CancellationToken,
    ) -> Result<RaceWinner> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::MalformedRequest(e.to_string()))?;

        let mut attempts: FuturesUnordered<_> = self
            .endpoints
            .iter()
            .map(|endpoint| self.attempt(endpoint, body.clone()))
            .collect();

        let mut failures = Vec::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("race cancelled with {} attempts in flight", attempts.len());
                    return Err(Error::RaceCancelled);
                }
                settled = attempts.next() => match settled {
                    Some(Ok(winner)) => {
                        debug!(
                            endpoint = %winner.endpoint_url,
                            elapsed_ms = winner.elapsed.as_millis() as u64,
                            losers_settled = failures.len(),
                            "race won"
                        );
                        metrics::RACES_WON.inc();
                        metrics::RACE_LATENCY.observe(winner.elapsed.as_secs_f64());
                        return Ok(winner);
                    }
                    Some(Err(failure)) => {
                        warn!(endpoint = %failure.url, reason = %failure.reason, "race attempt failed");
                        failures.push(failure);
                    }
                    None => break,
                }
            }
        }

        metrics::RACES_FAILED.inc();
        Err(Error::AllEndpointsFailed(failures))
    }

    /// One endpoint's attempt: POST the payload, read the body, classify.
    /// The timeout bounds the whole attempt including body download.
    async fn attempt(
        &self,
        endpoint: &RpcEndpoint,
        body: Vec<u8>,
    ) -> std::result::Result<RaceWinner, EndpointFailure> {
        let started = Instant::now();
        let url = endpoint.url.clone();

        let fail = |reason: AttemptError| EndpointFailure {
            url: url.clone(),
            reason,
        };

        let exchange = async {
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| AttemptError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AttemptError::HttpStatus(status.as_u16()));
            }

            response
                .bytes()
                .await
                .map_err(|e| AttemptError::Transport(e.to_string()))
        };

        let bytes = match tokio::time::timeout(self.attempt_timeout, exchange).await {
            Err(_) => return Err(fail(AttemptError::Timeout)),
            Ok(Err(reason)) => return Err(fail(reason)),
            Ok(Ok(bytes)) => bytes,
        };

        classify_body(&bytes).map_err(fail)?;

        Ok(RaceWinner {
            endpoint_url: url,
            body: bytes.to_vec(),
            elapsed: started.elapsed(),
        })
    }
}
