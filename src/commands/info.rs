use crate::abi::{self, Descriptors};
use crate::address::parse_any;
use crate::cli::InfoArgs;
use crate::commands::{connect, parse_unit, print_json};
use crate::config::{Config, Overrides};
use crate::reconcile::{tx_status, WalletState};
use crate::rpc::{call_contract, get_balance, RpcClient};
use crate::types::parse_u256;
use crate::units::{format_units, Denomination, Unit};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletOverview {
    address: String,
    balance: String,
    owners: Vec<String>,
    required: String,
    daily_limit: String,
    max_withdraw: String,
    spent_today: String,
    last_day: String,
    transaction_count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_balance: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionInfo {
    id: String,
    destination: String,
    value: String,
    confirmation: String,
    confirmed_by: Vec<String>,
    execution: String,
    data: Vec<String>,
}

pub async fn run(args: InfoArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let wallet = settings.contract()?;
    let client = connect(&settings)?;
    let unit = args
        .unit
        .as_deref()
        .map(|unit| parse_unit(&settings.denom, Some(unit)))
        .transpose()?;

    match args.id.as_deref() {
        Some(id) => {
            let info = transaction_info(&client, wallet, parse_u256(id)?, &settings.denom, unit)
                .await?;
            if args.json {
                return print_json(&info);
            }
            println!("ID: {}", info.id);
            println!("Destination: {}", info.destination);
            println!("Value: {}", info.value);
            println!("Confirmation: {}", info.confirmation);
            for owner in &info.confirmed_by {
                println!("  {owner}");
            }
            println!("Execution: {}", info.execution);
            for line in &info.data {
                println!("{line}");
            }
        }
        None => {
            let token = args
                .token
                .as_deref()
                .map(|token| parse_any(token, Some(settings.network_id)))
                .transpose()?;
            let overview = overview(&client, wallet, token, &settings.denom, unit).await?;
            if args.json {
                return print_json(&overview);
            }
            println!("Wallet: {}", overview.address);
            println!("Balance: {}", overview.balance);
            if let Some(token_balance) = &overview.token_balance {
                println!("Token balance: {token_balance}");
            }
            println!("Owners ({}):", overview.owners.len());
            for owner in &overview.owners {
                println!("  {owner}");
            }
            println!("Required: {}", overview.required);
            println!("Daily limit: {}", overview.daily_limit);
            println!("Remaining today: {}", overview.max_withdraw);
            println!("Spent today: {} (day {})", overview.spent_today, overview.last_day);
            println!("Transactions: {}", overview.transaction_count);
        }
    }
    Ok(())
}

async fn overview(
    client: &RpcClient,
    wallet: Address,
    token: Option<Address>,
    denom: &Denomination,
    unit: Option<Unit>,
) -> Result<WalletOverview> {
    let balance = get_balance(client, wallet)
        .await
        .context("failed to fetch wallet balance")?;
    let token_balance = match token {
        Some(token) => Some(token_balance(client, token, wallet).await?),
        None => None,
    };
    Ok(WalletOverview {
        address: format!("{wallet:#x}"),
        balance: denom.format_auto(balance, unit),
        owners: client
            .owners(wallet)
            .await?
            .iter()
            .map(|owner| format!("{owner:#x}"))
            .collect(),
        required: client.required(wallet).await?.to_string(),
        daily_limit: denom.format_auto(client.daily_limit(wallet).await?, unit),
        max_withdraw: denom.format_auto(client.max_withdraw(wallet).await?, unit),
        spent_today: denom.format_auto(client.spent_today(wallet).await?, unit),
        last_day: client.last_day(wallet).await?.to_string(),
        transaction_count: client.transaction_count(wallet).await?.to_string(),
        token_balance,
    })
}

async fn token_balance(client: &RpcClient, token: Address, holder: Address) -> Result<String> {
    let balance: U256 = call_contract(client, token, abi::balanceOfCall { account: holder })
        .await
        .with_context(|| format!("failed to read balance of token {token:#x}"))?;
    let decimals = client.token_decimals(token).await?;
    let symbol = call_contract(client, token, abi::symbolCall {})
        .await
        .unwrap_or_else(|_| format!("{token:#x}"));
    Ok(format!("{} {symbol}", format_units(balance, decimals)))
}

async fn transaction_info(
    state: &dyn WalletState,
    wallet: Address,
    id: U256,
    denom: &Denomination,
    unit: Option<Unit>,
) -> Result<TransactionInfo> {
    let status = tx_status(state, wallet, id).await?;
    let descriptors = Descriptors::load()?;
    Ok(TransactionInfo {
        id: status.id.to_string(),
        destination: format!("{:#x}", status.tx.destination),
        value: denom.format_auto(status.tx.value, unit),
        confirmation: status.confirmation_label(),
        confirmed_by: status
            .confirmed_by
            .iter()
            .map(|owner| format!("{owner:#x}"))
            .collect(),
        execution: status.execution_label().to_string(),
        data: descriptors.describe(&status.tx.data, denom),
    })
}
