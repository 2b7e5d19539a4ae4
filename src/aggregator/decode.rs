use num_bigint::BigUint;
use num_traits::{Num, ToPrimitive};

use crate::error::{Error, Result};

/// Decode a hex-encoded big integer as returned by `eth_call` /
/// `eth_blockNumber`. Accepts an optional `0x` prefix.
pub fn decode_hex_word(raw: &str) -> Result<BigUint> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(Error::SourceDecodeFailed("empty hex value".to_string()));
    }
    BigUint::from_str_radix(digits, 16)
        .map_err(|e| Error::SourceDecodeFailed(format!("bad hex value {:?}: {}", raw, e)))
}

/// Scale a raw integer down by 10^decimals into a display value. Values too
/// large for f64 arithmetic collapse to 0.0 rather than panicking or
/// propagating an error.
pub fn scale_to_f64(value: &BigUint, decimals: u32) -> f64 {
    let raw = value.to_f64().unwrap_or(f64::INFINITY);
    let scaled = raw / 10f64.powi(decimals as i32);
    if scaled.is_finite() { scaled } else { 0.0 }
}

pub fn decode_block_number(raw: &str) -> Result<u64> {
    decode_hex_word(raw)?
        .to_u64()
        .ok_or_else(|| Error::SourceDecodeFailed(format!("block number out of range: {:?}", raw)))
}
