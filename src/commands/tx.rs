use crate::action::Action;
use crate::address::parse_any;
use crate::cli::{TxIdArgs, TxListArgs, TxSubmitArgs};
use crate::commands::{connect, parse_unit, print_json, propose};
use crate::config::{Config, Overrides};
use crate::reconcile::{tx_status, Phase, TxStatus, WalletState};
use crate::types::parse_u256;
use crate::units::{Denomination, Unit};
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TxListItem {
    id: String,
    destination: String,
    value: String,
    confirmation: String,
    execution: String,
}

pub async fn run_submit(args: TxSubmitArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let unit = parse_unit(&settings.denom, args.unit.as_deref())?;
    let action = Action::Submit {
        destination: parse_any(&args.to, Some(settings.network_id))?,
        value: settings.denom.to_minor(&args.amount, unit)?,
        data: args
            .data
            .map(|message| Bytes::from(message.into_bytes()))
            .unwrap_or_default(),
    };
    propose(&config, &overrides, action, &args.wait).await
}

pub async fn run_confirm(args: TxIdArgs, config: Config, overrides: Overrides) -> Result<()> {
    let id = parse_u256(&args.id)?;
    propose(&config, &overrides, Action::Confirm { id }, &args.wait).await
}

pub async fn run_revoke(args: TxIdArgs, config: Config, overrides: Overrides) -> Result<()> {
    let id = parse_u256(&args.id)?;
    propose(&config, &overrides, Action::Revoke { id }, &args.wait).await
}

pub async fn run_execute(args: TxIdArgs, config: Config, overrides: Overrides) -> Result<()> {
    let id = parse_u256(&args.id)?;
    propose(&config, &overrides, Action::Execute { id }, &args.wait).await
}

pub async fn run_list(args: TxListArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let wallet = settings.contract()?;
    let client = connect(&settings)?;
    let unit = args
        .unit
        .as_deref()
        .map(|unit| parse_unit(&settings.denom, Some(unit)))
        .transpose()?;

    let filter = PhaseFilter {
        pending: args.pending,
        executed: args.executed,
    };
    let statuses = list(&client, wallet, args.from_index, args.to_index, filter).await?;
    let items: Vec<TxListItem> = statuses
        .iter()
        .map(|status| list_item(status, &settings.denom, unit))
        .collect();

    if args.json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("no transactions");
        return Ok(());
    }
    println!(
        "{:<6} {:<44} {:<28} {:<18} {}",
        "id", "destination", "value", "confirmation", "execution"
    );
    for item in items {
        println!(
            "{:<6} {:<44} {:<28} {:<18} {}",
            item.id, item.destination, item.value, item.confirmation, item.execution
        );
    }
    Ok(())
}

/// With neither flag set every transaction is listed.
#[derive(Debug, Clone, Copy, Default)]
struct PhaseFilter {
    pending: bool,
    executed: bool,
}

impl PhaseFilter {
    fn accepts(self, phase: Phase) -> bool {
        let executed = phase == Phase::Executed;
        match (self.pending, self.executed) {
            (false, false) | (true, true) => true,
            (true, false) => !executed,
            (false, true) => executed,
        }
    }
}

/// Statuses of ids in `[from, to)`, clamped to the wallet's transaction count.
async fn list(
    state: &dyn WalletState,
    wallet: Address,
    from: Option<u64>,
    to: Option<u64>,
    filter: PhaseFilter,
) -> Result<Vec<TxStatus>> {
    let count = state.transaction_count(wallet).await?;
    let end = to.map_or(count, |to| U256::from(to).min(count));
    let mut id = U256::from(from.unwrap_or(0));
    let mut statuses = Vec::new();
    while id < end {
        let status = tx_status(state, wallet, id).await?;
        if filter.accepts(status.phase()) {
            statuses.push(status);
        }
        id += U256::from(1u64);
    }
    Ok(statuses)
}

fn list_item(status: &TxStatus, denom: &Denomination, unit: Option<Unit>) -> TxListItem {
    TxListItem {
        id: status.id.to_string(),
        destination: format!("{:#x}", status.tx.destination),
        value: denom.format_auto(status.tx.value, unit),
        confirmation: status.confirmation_label(),
        execution: status.execution_label().to_string(),
    }
}
