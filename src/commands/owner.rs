use crate::action::Action;
use crate::address::parse_any;
use crate::cli::{OwnerChangeArgs, OwnerCheckArgs, OwnerListArgs, OwnerReplaceArgs};
use crate::commands::{connect, print_json, propose};
use crate::config::{Config, Overrides};
use crate::reconcile::WalletState;
use anyhow::Result;

pub async fn run_list(args: OwnerListArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let wallet = settings.contract()?;
    let client = connect(&settings)?;
    let owners: Vec<String> = client
        .owners(wallet)
        .await?
        .iter()
        .map(|owner| format!("{owner:#x}"))
        .collect();

    if args.json {
        return print_json(&owners);
    }
    let required = client.required(wallet).await?;
    println!("Owners ({}), {required} required:", owners.len());
    for owner in owners {
        println!("  {owner}");
    }
    Ok(())
}

pub async fn run_check(args: OwnerCheckArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let wallet = settings.contract()?;
    let owner = parse_any(&args.address, Some(settings.network_id))?;
    let client = connect(&settings)?;
    if client.is_owner(wallet, owner).await? {
        println!("{owner:#x} is an owner of {wallet:#x}");
    } else {
        println!("{owner:#x} is not an owner of {wallet:#x}");
    }
    Ok(())
}

pub async fn run_add(args: OwnerChangeArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let owner = parse_any(&args.address, Some(settings.network_id))?;
    propose(&config, &overrides, Action::OwnerAdd { owner }, &args.wait).await
}

pub async fn run_remove(args: OwnerChangeArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let owner = parse_any(&args.address, Some(settings.network_id))?;
    propose(&config, &overrides, Action::OwnerRemove { owner }, &args.wait).await
}

pub async fn run_replace(
    args: OwnerReplaceArgs,
    config: Config,
    overrides: Overrides,
) -> Result<()> {
    let settings = config.resolve(&overrides);
    let action = Action::OwnerReplace {
        owner: parse_any(&args.old, Some(settings.network_id))?,
        new_owner: parse_any(&args.new, Some(settings.network_id))?,
    };
    propose(&config, &overrides, action, &args.wait).await
}
