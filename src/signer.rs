use crate::guide::Prompter;
use crate::record::TxRecord;
use crate::rpc::Node;
use crate::units::Denomination;
use alloy_consensus::transaction::RlpEcdsaEncodableTx;
use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use rand::RngCore;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Passphrase attempts before unlocking fails.
pub const UNLOCK_ATTEMPTS: usize = 2;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("no keystore for {0:#x} in {1}")]
    NoCredential(Address, String),
    #[error("Empty wallet, create account first")]
    EmptyWallet,
    #[error("failed to unlock {0:#x} after {UNLOCK_ATTEMPTS} attempts")]
    UnlockFailed(Address),
    #[error("keystore unlocked {found:#x}, expected {expected:#x}")]
    SignerMismatch { expected: Address, found: Address },
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Fields read from a v3 keystore without decrypting it. Files written by
/// [`Keystore::create`] carry no `address`, only an address-named file.
#[derive(Deserialize)]
struct KeystoreHeader {
    #[serde(default)]
    address: Option<String>,
    #[serde(rename = "crypto", alias = "Crypto")]
    _crypto: serde::de::IgnoredAny,
}

/// Directory of encrypted v3 keystore files.
#[derive(Debug, Clone)]
pub struct Keystore {
    dir: PathBuf,
}

impl Keystore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Accounts in the directory, sorted by file name.
    pub fn list(&self) -> Result<Vec<(Address, PathBuf)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read wallet {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut accounts = Vec::with_capacity(paths.len());
        for path in paths {
            match read_address(&path) {
                Ok(address) => accounts.push((address, path)),
                Err(err) => debug!(path = %path.display(), %err, "skipping non-keystore file"),
            }
        }
        Ok(accounts)
    }

    pub fn find(&self, address: Address) -> Result<PathBuf> {
        self.list()?
            .into_iter()
            .find(|(candidate, _)| *candidate == address)
            .map(|(_, path)| path)
            .ok_or_else(|| {
                SignerError::NoCredential(address, self.dir.display().to_string()).into()
            })
    }

    pub fn first(&self) -> Result<Address> {
        self.list()?
            .first()
            .map(|(address, _)| *address)
            .ok_or_else(|| SignerError::EmptyWallet.into())
    }

    pub fn create(&self, password: &str) -> Result<Address> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create wallet {}", self.dir.display()))?;
        let mut rng = rand::thread_rng();
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        let address = PrivateKeySigner::from_slice(&key)
            .context("failed to derive account key")?
            .address();
        let name = format!("UTC--{}", hex::encode(address));
        let (signer, file) =
            PrivateKeySigner::encrypt_keystore(&self.dir, &mut rng, key, password, Some(&name))
                .context("failed to create keystore")?;
        info!(address = %signer.address(), file = %file, "account created");
        Ok(signer.address())
    }

    /// Decrypt the key for `address`, trying `credential` first and then
    /// prompting.
    pub fn unlock(
        &self,
        address: Address,
        credential: Option<&str>,
        prompter: &mut dyn Prompter,
    ) -> Result<PrivateKeySigner> {
        let path = self.find(address)?;
        let mut credential = credential.map(str::to_string);
        for attempt in 1..=UNLOCK_ATTEMPTS {
            let password = match credential.take() {
                Some(password) => password,
                None => prompter.password(&format!(
                    "Unlocking account {address:#x} | Attempt {attempt}/{UNLOCK_ATTEMPTS}: "
                ))?,
            };
            match PrivateKeySigner::decrypt_keystore(&path, password) {
                Ok(signer) if signer.address() == address => return Ok(signer),
                Ok(signer) => {
                    return Err(SignerError::SignerMismatch {
                        expected: address,
                        found: signer.address(),
                    }
                    .into())
                }
                Err(err) => warn!(%address, attempt, %err, "unlock failed"),
            }
        }
        Err(SignerError::UnlockFailed(address).into())
    }
}

fn read_address(path: &Path) -> Result<Address> {
    let contents = fs::read_to_string(path)?;
    let header: KeystoreHeader = serde_json::from_str(&contents)?;
    match header.address {
        Some(address) => crate::types::parse_address(&address),
        None => address_from_file_name(path)
            .ok_or_else(|| anyhow::anyhow!("keystore {} names no address", path.display())),
    }
}

/// Trailing 40 hex digits of the file name, as in `UTC--<time>--<address>`.
fn address_from_file_name(path: &Path) -> Option<Address> {
    let name = path.file_name()?.to_str()?;
    let tail = name.get(name.len().checked_sub(40)?..)?;
    tail.parse().ok()
}

/// A signed transaction in its canonical wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub raw: Bytes,
    pub hash: B256,
}

impl SignedTx {
    pub fn to_hex(&self) -> String {
        crate::types::format_hex(&self.raw)
    }
}

/// Sign `record` as an EIP-155 legacy transaction. No network access.
pub fn sign_record(record: &TxRecord, signer: &PrivateKeySigner) -> Result<SignedTx> {
    if signer.address() != record.from {
        return Err(SignerError::SignerMismatch {
            expected: record.from,
            found: signer.address(),
        }
        .into());
    }

    let tx = TxLegacy {
        chain_id: Some(record.network_id),
        nonce: record.nonce,
        gas_price: record.gas_price,
        gas_limit: record.gas_limit,
        to: record.to.map_or(TxKind::Create, TxKind::Call),
        value: record.value,
        input: record.data.clone(),
    };
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|err| SignerError::Signing(err.to_string()))?;

    let mut raw = Vec::with_capacity(tx.rlp_encoded_length_with_signature(&signature));
    tx.rlp_encode_signed(&signature, &mut raw);
    let hash = keccak256(&raw);
    Ok(SignedTx {
        raw: Bytes::from(raw),
        hash,
    })
}

/// Fill nonce, gas price, gas limit and chain id from the node.
///
/// The estimate is inflated by half to absorb estimation error.
pub async fn fill_envelope(node: &dyn Node, record: &mut TxRecord) -> Result<()> {
    record.network_id = node.chain_id().await?;
    record.nonce = node.nonce(record.from).await?;
    record.gas_price = node.gas_price().await?;
    let estimate = node.estimate_gas(record).await?;
    record.gas_limit = (estimate.saturating_mul(3) / 2).max(crate::record::GAS_FLOOR);
    debug!(
        nonce = record.nonce,
        gas_price = record.gas_price,
        gas_limit = record.gas_limit,
        "envelope filled"
    );
    Ok(())
}

/// Signs records against a live node: unlock, show the summary, sign.
pub struct ConnectedSigner<'a> {
    pub keystore: &'a Keystore,
    pub denom: &'a Denomination,
}

impl ConnectedSigner<'_> {
    pub fn sign(&self, record: &TxRecord, prompter: &mut dyn Prompter) -> Result<SignedTx> {
        let signer = self
            .keystore
            .unlock(record.from, record.credential.as_deref(), prompter)?;
        for line in record.summary(self.denom) {
            println!("{line}");
        }
        sign_record(record, &signer)
    }
}
