use crate::address::{self, parse_any};
use crate::cli::{AccountBalanceArgs, AccountConvertArgs, AccountListArgs, AccountNewArgs};
use crate::commands::init::new_password;
use crate::commands::{connect, keystore, parse_unit, print_json};
use crate::config::{Config, Overrides};
use crate::guide::TerminalPrompter;
use crate::rpc::{get_balance, Node};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountItem {
    address: String,
    file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceItem {
    address: String,
    balance: String,
}

pub async fn run_new(args: AccountNewArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let keystore = keystore(&settings);
    let password = new_password(&mut TerminalPrompter)?;
    for _ in 0..args.count {
        let address = keystore.create(&password)?;
        println!("{address:#x}");
    }
    Ok(())
}

pub async fn run_list(args: AccountListArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let keystore = keystore(&settings);
    let accounts = keystore.list()?;

    if args.json {
        let items: Vec<AccountItem> = accounts
            .iter()
            .map(|(address, path)| AccountItem {
                address: format!("{address:#x}"),
                file: path.display().to_string(),
            })
            .collect();
        return print_json(&items);
    }

    if accounts.is_empty() {
        println!("no accounts in {}", keystore.dir().display());
        return Ok(());
    }
    for (address, _) in accounts {
        println!("{address:#x}");
    }
    Ok(())
}

pub async fn run_balance(
    args: AccountBalanceArgs,
    config: Config,
    overrides: Overrides,
) -> Result<()> {
    let settings = config.resolve(&overrides);
    let unit = args
        .unit
        .as_deref()
        .map(|unit| parse_unit(&settings.denom, Some(unit)))
        .transpose()?;
    let addresses: Vec<Address> = if args.addresses.is_empty() {
        keystore(&settings)
            .list()?
            .into_iter()
            .map(|(address, _)| address)
            .collect()
    } else {
        args.addresses
            .iter()
            .map(|text| parse_any(text, Some(settings.network_id)))
            .collect::<Result<_>>()?
    };

    let client = connect(&settings)?;
    let mut items = Vec::with_capacity(addresses.len());
    for address in addresses {
        let balance = get_balance(&client, address)
            .await
            .with_context(|| format!("failed to fetch balance of {address:#x}"))?;
        items.push(BalanceItem {
            address: format!("{address:#x}"),
            balance: settings.denom.format_auto(balance, unit),
        });
    }

    if args.json {
        return print_json(&items);
    }
    for item in items {
        println!("{}: {}", item.address, item.balance);
    }
    Ok(())
}

/// Hex addresses become chain-qualified text and vice versa, using the
/// node's chain id.
pub async fn run_convert(
    args: AccountConvertArgs,
    config: Config,
    overrides: Overrides,
) -> Result<()> {
    let settings = config.resolve(&overrides);
    let client = connect(&settings)?;
    let chain_id = client
        .chain_id()
        .await
        .context("failed to fetch chain id")?;

    for text in &args.addresses {
        let text = text.trim();
        if text.starts_with(address::ADDRESS_PREFIX) {
            let raw = address::decode(text, chain_id)?;
            println!("{text} -> {raw:#x}");
        } else {
            let raw = parse_any(text, None)?;
            println!("{text} -> {}", address::encode(chain_id, raw));
        }
    }
    Ok(())
}
