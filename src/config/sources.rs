use serde::{Deserialize, Serialize};

/// `totalSupply()` — the read selector used by every default source.
const TOTAL_SUPPLY_SELECTOR: &str = "0x18160ddd";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub sources: Vec<SourceConfig>,
}

fn default_chain_id() -> u64 {
    1
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: String,
    /// Contract the aggregator reads from.
    pub address: String,
    /// 4-byte call selector, hex-encoded.
    pub selector: String,
    /// Fixed-point scale of the raw value.
    pub decimals: u32,
    /// Weight applied to |Δ primary value| for the flow proxy.
    pub flow_weight: f64,
    pub enabled: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            chain_id: 1,
            sources: vec![
                source("USDC", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", 6, 1.0),
                source("USDT", "0xdac17f958d2ee523a2206206994597c13d831ec7", 6, 1.0),
                source("DAI", "0x6b175474e89094c44da98b954eedeac495271d0f", 18, 1.0),
                source("WETH", "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", 18, 0.5),
                source("WBTC", "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", 8, 0.25),
            ],
        }
    }
}

fn source(id: &str, address: &str, decimals: u32, flow_weight: f64) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        address: address.to_string(),
        selector: TOTAL_SUPPLY_SELECTOR.to_string(),
        decimals,
        flow_weight,
        enabled: true,
    }
}
