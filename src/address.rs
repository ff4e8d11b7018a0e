use alloy_primitives::Address;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Literal tag in front of every chain-qualified address.
pub const ADDRESS_PREFIX: &str = "NEW";

const VERSION: u8 = 0;
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressCodecError {
    #[error("address {0} does not start with {ADDRESS_PREFIX}")]
    MissingPrefix(String),
    #[error("invalid base58 payload: {0}")]
    Base58(String),
    #[error("checksum mismatch")]
    Checksum,
    #[error("unexpected version byte {0}")]
    Version(u8),
    #[error("decoded payload is {0} bytes, expected at least 20")]
    Length(usize),
    #[error("address belongs to chain 0x{found}, expected chain {expected}")]
    ChainMismatch { expected: u64, found: String },
}

/// Encode `address` as `NEW` followed by base58check(chain id ‖ address).
pub fn encode(chain_id: u64, address: Address) -> String {
    let chain = chain_id_bytes(chain_id);
    let mut full = Vec::with_capacity(1 + chain.len() + 20 + CHECKSUM_LEN);
    full.push(VERSION);
    full.extend_from_slice(&chain);
    full.extend_from_slice(address.as_slice());
    let checksum = checksum(&full);
    full.extend_from_slice(&checksum);
    format!("{ADDRESS_PREFIX}{}", bs58::encode(full).into_string())
}

pub fn decode(text: &str, chain_id: u64) -> Result<Address, AddressCodecError> {
    let text = text.trim();
    let body = text
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or_else(|| AddressCodecError::MissingPrefix(text.to_string()))?;
    let raw = bs58::decode(body)
        .into_vec()
        .map_err(|err| AddressCodecError::Base58(err.to_string()))?;
    if raw.len() < 1 + CHECKSUM_LEN {
        return Err(AddressCodecError::Length(raw.len().saturating_sub(1)));
    }

    let (full, sum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if checksum(full) != sum {
        return Err(AddressCodecError::Checksum);
    }
    if full[0] != VERSION {
        return Err(AddressCodecError::Version(full[0]));
    }
    let payload = &full[1..];
    if payload.len() < 20 {
        return Err(AddressCodecError::Length(payload.len()));
    }

    let (chain, address) = payload.split_at(payload.len() - 20);
    if chain != chain_id_bytes(chain_id).as_slice() {
        return Err(AddressCodecError::ChainMismatch {
            expected: chain_id,
            found: hex::encode(chain),
        });
    }
    Ok(Address::from_slice(address))
}

/// Accept either hex or the chain-qualified form.
pub fn parse_any(text: &str, chain_id: Option<u64>) -> anyhow::Result<Address> {
    let text = text.trim();
    if text.starts_with(ADDRESS_PREFIX) {
        let chain_id = chain_id
            .ok_or_else(|| anyhow::anyhow!("chain id required to decode {text}"))?;
        return Ok(decode(text, chain_id)?);
    }
    crate::types::parse_address(text)
}

/// Minimal big-endian bytes, empty for zero.
fn chain_id_bytes(chain_id: u64) -> Vec<u8> {
    let bytes = chain_id.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}
