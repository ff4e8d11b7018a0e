pub mod account;
pub mod broadcast;
pub mod build;
pub mod info;
pub mod init;
pub mod owner;
pub mod sign;
pub mod tx;
pub mod update;
pub mod watch;

use crate::abi::Descriptors;
use crate::action::Action;
use crate::broadcast::report;
use crate::cli::WaitArgs;
use crate::config::{Config, Overrides, Settings};
use crate::guide::TerminalPrompter;
use crate::record::TxRecord;
use crate::rpc::RpcClient;
use crate::session::{Outcome, Session};
use crate::signer::Keystore;
use crate::units::{Denomination, Unit};
use alloy_primitives::Address;
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Receipt wait when `--timeout-ms` is not given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub fn deadline(wait: &WaitArgs) -> Duration {
    wait.timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT)
}

pub fn connect(settings: &Settings) -> Result<RpcClient> {
    let client = RpcClient::new(&settings.rpc_url)?;
    debug!(url = %client.url, "rpc client ready");
    Ok(client)
}

pub fn keystore(settings: &Settings) -> Keystore {
    Keystore::new(&settings.wallet_path)
}

pub fn parse_unit(denom: &Denomination, unit: Option<&str>) -> Result<Unit> {
    Ok(unit
        .map(|unit| denom.parse_unit(unit))
        .transpose()?
        .unwrap_or_default())
}

/// Address to sign with: `--from`, the config, or the first keystore account.
pub fn sender(settings: &Settings) -> Result<Address> {
    match settings.sender()? {
        Some(from) => Ok(from),
        None => keystore(settings).first(),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Sign and broadcast `action` against the configured wallet, then report.
pub async fn propose(
    config: &Config,
    overrides: &Overrides,
    action: Action,
    wait: &WaitArgs,
) -> Result<()> {
    let settings = config.resolve(overrides);
    let client = connect(&settings)?;
    let keystore = keystore(&settings);
    let descriptors = Descriptors::load()?;
    let template = TxRecord {
        from: sender(&settings)?,
        ..settings.new_record()?
    };

    let session = Session {
        node: &client,
        state: &client,
        keystore: &keystore,
        descriptors: &descriptors,
        denom: &settings.denom,
        wallet: settings.contract()?,
        deadline: deadline(wait),
    };
    info!(action = %action.kind(), wallet = %session.wallet, "proposing");
    match session.propose(&template, action, &mut TerminalPrompter).await? {
        Outcome::Mined { receipt, status } => {
            report(&receipt)?;
            if let Some(status) = status {
                println!(
                    "Wallet transaction {}: {} {}",
                    status.id,
                    status.confirmation_label(),
                    status.execution_label()
                );
            }
        }
        Outcome::AlreadySatisfied(satisfied) => println!("Nothing to do: {satisfied}"),
    }
    Ok(())
}
