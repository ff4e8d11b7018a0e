use crate::action::Action;
use crate::address::parse_any;
use crate::types::{bytes_from_hex, format_hex};
use crate::units::{Denomination, Unit};
use alloy_primitives::{Address, Bytes, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Minimum gas of a plain value transfer.
pub const GAS_FLOOR: u64 = 21_000;
pub const DEFAULT_GAS_PRICE: u128 = 1;
pub const DEFAULT_NETWORK_ID: u64 = 16888;

/// A transaction intent, portable as a JSON file between an online and an
/// air-gapped machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub from: Address,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub unit: Unit,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub network_id: u64,
    pub credential: Option<String>,
    pub action: Option<Action>,
}

impl Default for TxRecord {
    fn default() -> Self {
        Self {
            from: Address::ZERO,
            to: None,
            value: U256::ZERO,
            unit: Unit::Major,
            data: Bytes::new(),
            nonce: 0,
            gas_price: DEFAULT_GAS_PRICE,
            gas_limit: GAS_FLOOR,
            network_id: DEFAULT_NETWORK_ID,
            credential: None,
            action: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<u64>,
    #[serde(rename = "gasPrice", skip_serializing_if = "Option::is_none")]
    gas_price: Option<u128>,
    #[serde(rename = "gas", skip_serializing_if = "Option::is_none")]
    gas_limit: Option<u64>,
    #[serde(rename = "networkID", skip_serializing_if = "Option::is_none")]
    network_id: Option<u64>,
    #[serde(default, skip_serializing)]
    password: Option<String>,
}

impl TxRecord {
    /// Pretty JSON of every field except the credential.
    pub fn to_json(&self, denom: &Denomination) -> Result<String> {
        let file = RecordFile {
            from: Some(format!("{:#x}", self.from)),
            to: self.to.map(|to| format!("{to:#x}")),
            value: Some(denom.format(self.value, self.unit)),
            unit: Some(denom.unit_name(self.unit).to_string()),
            data: Some(format_hex(&self.data)),
            nonce: Some(self.nonce),
            gas_price: Some(self.gas_price),
            gas_limit: Some(self.gas_limit),
            network_id: Some(self.network_id),
            password: None,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Overlay the fields present in `json` onto this record.
    ///
    /// Absent fields keep their current value and a gas limit below
    /// [`GAS_FLOOR`] is ignored.
    pub fn merge_json(&mut self, json: &str, denom: &Denomination) -> Result<()> {
        let file: RecordFile =
            serde_json::from_str(json).context("failed to parse transaction json")?;

        if let Some(network_id) = file.network_id {
            self.network_id = network_id;
        }
        if let Some(from) = file.from.as_deref() {
            self.from = parse_any(from, Some(self.network_id))?;
        }
        if let Some(to) = file.to.as_deref() {
            self.to = if to.trim().is_empty() {
                None
            } else {
                Some(parse_any(to, Some(self.network_id))?)
            };
        }
        if let Some(unit) = file.unit.as_deref() {
            self.unit = denom.parse_unit(unit)?;
        }
        if let Some(value) = file.value.as_deref() {
            self.value = denom.to_minor(value, self.unit)?;
        }
        if let Some(data) = file.data.as_deref() {
            self.data = bytes_from_hex(data)?;
        }
        if let Some(nonce) = file.nonce {
            self.nonce = nonce;
        }
        if let Some(gas_price) = file.gas_price {
            self.gas_price = gas_price;
        }
        match file.gas_limit {
            Some(gas_limit) if gas_limit >= GAS_FLOOR => self.gas_limit = gas_limit,
            Some(gas_limit) => {
                warn!(gas_limit, floor = GAS_FLOOR, "ignoring gas limit below floor")
            }
            None => {}
        }
        if let Some(password) = file.password.filter(|password| !password.is_empty()) {
            self.credential = Some(password);
        }
        Ok(())
    }

    /// Write the record followed by a newline.
    pub fn save(&self, path: &Path, denom: &Denomination) -> Result<()> {
        let mut contents = self.to_json(denom)?;
        contents.push('\n');
        fs::write(path, contents)
            .with_context(|| format!("failed to write transaction {}", path.display()))
    }

    pub fn merge_file(&mut self, path: &Path, denom: &Denomination) -> Result<()> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read transaction {}", path.display()))?;
        self.merge_json(&contents, denom)
            .with_context(|| format!("invalid transaction file {}", path.display()))
    }

    pub fn fee(&self) -> U256 {
        U256::from(self.gas_price) * U256::from(self.gas_limit)
    }

    pub fn summary(&self, denom: &Denomination) -> Vec<String> {
        let to = match self.to {
            Some(to) => format!("{to:#x}"),
            None => "ContractCreate".to_string(),
        };
        vec![
            format!("From: {:#x}", self.from),
            format!("To: {to}"),
            format!("Value: {}", denom.format_auto(self.value, Some(self.unit))),
            format!("Data: {}", format_hex(&self.data)),
            format!("Nonce: {}", self.nonce),
            format!("GasPrice: {}", self.gas_price),
            format!("GasLimit: {}", self.gas_limit),
            format!("GasFee: {}", denom.format_auto(self.fee(), None)),
        ]
    }
}
