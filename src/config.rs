use crate::address::parse_any;
use crate::record::{TxRecord, DEFAULT_GAS_PRICE, DEFAULT_NETWORK_ID, GAS_FLOOR};
use crate::units::Denomination;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_WALLET_PATH: &str = "./wallet";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    pub rpc_url: Option<String>,
    pub wallet_path: Option<PathBuf>,
    pub contract_address: Option<String>,
    pub from: Option<String>,
    pub default_network_id: Option<u64>,
    pub denomination: Option<Denomination>,
    pub gas: Option<GasConfig>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct GasConfig {
    pub default_price: Option<u64>,
    pub default_limit: Option<u64>,
}

/// Values given on the command line, which win over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub wallet_path: Option<PathBuf>,
    pub contract_address: Option<String>,
    pub from: Option<String>,
}

/// Configuration with every default applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub wallet_path: PathBuf,
    pub contract_address: Option<String>,
    pub from: Option<String>,
    pub network_id: u64,
    pub denom: Denomination,
    pub gas_price: u128,
    pub gas_limit: u64,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            return Ok(Self {
                path,
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.path = path;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = if self.path.as_os_str().is_empty() {
            default_config_path()
        } else {
            self.path.clone()
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&self)?;
        fs::write(&path, contents)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn resolve(&self, overrides: &Overrides) -> Settings {
        let gas = self.gas.clone().unwrap_or_default();
        Settings {
            rpc_url: overrides
                .rpc_url
                .clone()
                .or_else(|| self.rpc_url.clone())
                .unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            wallet_path: overrides
                .wallet_path
                .clone()
                .or_else(|| self.wallet_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WALLET_PATH)),
            contract_address: overrides
                .contract_address
                .clone()
                .or_else(|| self.contract_address.clone()),
            from: overrides.from.clone().or_else(|| self.from.clone()),
            network_id: self.default_network_id.unwrap_or(DEFAULT_NETWORK_ID),
            denom: self.denomination.clone().unwrap_or_default(),
            gas_price: gas.default_price.map_or(DEFAULT_GAS_PRICE, u128::from),
            gas_limit: gas.default_limit.unwrap_or(GAS_FLOOR).max(GAS_FLOOR),
        }
    }
}

impl Settings {
    pub fn contract(&self) -> Result<Address> {
        let text = self
            .contract_address
            .as_deref()
            .context("no contract address configured (set --contract-address or run init)")?;
        parse_any(text, Some(self.network_id))
    }

    pub fn sender(&self) -> Result<Option<Address>> {
        self.from
            .as_deref()
            .map(|text| parse_any(text, Some(self.network_id)))
            .transpose()
    }

    /// Record template with the configured defaults.
    pub fn new_record(&self) -> Result<TxRecord> {
        let mut record = TxRecord {
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            network_id: self.network_id,
            ..TxRecord::default()
        };
        if let Some(text) = self.contract_address.as_deref() {
            record.to = Some(parse_any(text, Some(self.network_id))?);
        }
        if let Some(from) = self.sender()? {
            record.from = from;
        }
        Ok(record)
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("msw-cli").join("config.toml");
    }
    PathBuf::from("./config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ALICE, WALLET};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.path, path);

        let settings = config.resolve(&Overrides::default());
        assert_eq!(settings.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(settings.wallet_path, PathBuf::from(DEFAULT_WALLET_PATH));
        assert_eq!(settings.network_id, DEFAULT_NETWORK_ID);
        assert_eq!(settings.denom, Denomination::default());
        assert!(settings.contract().is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            rpc_url: Some("https://rpc.example".to_string()),
            contract_address: Some(format!("{WALLET:#x}")),
            default_network_id: Some(1007),
            denomination: Some(Denomination::newchain()),
            gas: Some(GasConfig {
                default_price: Some(100),
                default_limit: None,
            }),
            path: path.clone(),
            ..Config::default()
        };
        config.save().expect("save");

        let loaded = Config::load(Some(&path)).expect("load");
        let settings = loaded.resolve(&Overrides::default());
        assert_eq!(settings.rpc_url, "https://rpc.example");
        assert_eq!(settings.denom.major, "NEW");
        assert_eq!(settings.gas_price, 100);
        assert_eq!(settings.contract().expect("contract"), WALLET);
    }

    #[test]
    fn flags_override_file() {
        let config = Config {
            rpc_url: Some("https://file.example".to_string()),
            from: Some(format!("{WALLET:#x}")),
            ..Config::default()
        };
        let settings = config.resolve(&Overrides {
            rpc_url: Some("https://flag.example".to_string()),
            from: Some(format!("{ALICE:#x}")),
            ..Overrides::default()
        });
        assert_eq!(settings.rpc_url, "https://flag.example");
        assert_eq!(settings.sender().expect("sender"), Some(ALICE));
    }

    #[test]
    fn record_template_uses_configured_defaults() {
        let config = Config {
            contract_address: Some(format!("{WALLET:#x}")),
            from: Some(format!("{ALICE:#x}")),
            default_network_id: Some(1007),
            gas: Some(GasConfig {
                default_price: Some(5),
                default_limit: Some(100),
            }),
            ..Config::default()
        };
        let record = config
            .resolve(&Overrides::default())
            .new_record()
            .expect("record");
        assert_eq!(record.to, Some(WALLET));
        assert_eq!(record.from, ALICE);
        assert_eq!(record.network_id, 1007);
        assert_eq!(record.gas_price, 5);
        assert_eq!(record.gas_limit, GAS_FLOOR);
    }
}
