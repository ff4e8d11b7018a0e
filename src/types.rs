use alloy_primitives::{Address, Bytes, U256};
use anyhow::{anyhow, Result};
use std::str::FromStr;

pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|err| anyhow!("invalid address {value}: {err}"))
}

pub fn parse_u256(value: &str) -> Result<U256> {
    U256::from_str(value.trim()).map_err(|err| anyhow!("invalid uint256 {value}: {err}"))
}

pub fn format_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn bytes_from_hex(value: &str) -> Result<Bytes> {
    let trimmed = value.trim();
    let value = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(value).map_err(|err| anyhow!("invalid hex {value}: {err}"))?;
    Ok(Bytes::from(bytes))
}

/// Render a payload as text when it is printable UTF-8.
pub fn printable_text(bytes: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?;
    if text.chars().all(|c| !c.is_control() || c.is_whitespace()) {
        Some(text)
    } else {
        None
    }
}
