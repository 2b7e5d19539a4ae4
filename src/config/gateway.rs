use serde::{Deserialize, Serialize};

use crate::rpc::router::DEFAULT_ATTEMPT_TIMEOUT_MS;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Upstream JSON-RPC endpoints raced on every request. Order carries no
    /// semantic weight; it is only the fan-out set.
    pub endpoints: Vec<String>,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            endpoints: vec![
                "https://cloudflare-eth.com".to_string(),
                "https://rpc.ankr.com/eth".to_string(),
                "https://eth.llamarpc.com".to_string(),
            ],
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
        }
    }
}
