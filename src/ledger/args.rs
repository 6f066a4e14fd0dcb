//! Decoding of caller-supplied arguments and ledger identifiers.
//!
//! Everything here runs before any network call; malformed input fails
//! with `Decode`.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::ledger::types::{GatewayError, GatewayResult};

/// Decode a base64 blob holding a JSON array of strings.
pub fn decode_args(blob: &str) -> GatewayResult<Vec<String>> {
    let raw = STANDARD
        .decode(blob.trim().as_bytes())
        .map_err(|e| GatewayError::Decode(format!("Arguments are not valid base64: {}", e)))?;
    serde_json::from_slice::<Vec<String>>(&raw).map_err(|e| {
        GatewayError::Decode(format!("Arguments are not a JSON array of strings: {}", e))
    })
}

/// Arguments as opaque byte strings for a proposal.
pub fn args_to_bytes(args: &[String]) -> Vec<Vec<u8>> {
    args.iter().map(|arg| arg.as_bytes().to_vec()).collect()
}

/// Parse a block number: decimal digits only, fits in `u64`.
pub fn parse_block_number(raw: &str) -> GatewayResult<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::Decode(format!(
            "Block number '{}' is not a non-negative integer",
            raw
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| GatewayError::Decode(format!("Block number '{}' out of range: {}", raw, e)))
}

/// Decode a hex block hash.
pub fn decode_block_hash(raw: &str) -> GatewayResult<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::Decode("Block hash is empty".to_string()));
    }
    hex::decode(trimmed)
        .map_err(|e| GatewayError::Decode(format!("Block hash '{}' is not hex: {}", raw, e)))
}

/// Check a transaction id is non-empty hex.
pub fn validate_tx_id(raw: &str) -> GatewayResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(GatewayError::Decode(format!(
            "Transaction id '{}' is not a hex string",
            raw
        )));
    }
    Ok(trimmed)
}
