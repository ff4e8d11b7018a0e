use crate::address::parse_any;
use crate::cli::InitArgs;
use crate::config::{Config, Overrides};
use crate::guide::{Prompter, TerminalPrompter};
use crate::signer::Keystore;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;

/// Ask for each setting, keeping the current value on an empty answer.
pub async fn run(args: InitArgs, mut config: Config, overrides: Overrides) -> Result<()> {
    let mut prompter = TerminalPrompter;
    let current = config.resolve(&overrides);

    config.rpc_url = Some(ask(&mut prompter, "RPC URL", &current.rpc_url)?);
    let wallet_path = ask(
        &mut prompter,
        "Keystore directory",
        &current.wallet_path.display().to_string(),
    )?;
    let wallet_path = PathBuf::from(wallet_path);
    config.wallet_path = Some(wallet_path.clone());

    let network_id = ask(&mut prompter, "Chain id", &current.network_id.to_string())?;
    let network_id: u64 = network_id
        .parse()
        .map_err(|err| anyhow!("invalid chain id {network_id}: {err}"))?;
    config.default_network_id = Some(network_id);

    let contract = ask(
        &mut prompter,
        "Multisig wallet address",
        current.contract_address.as_deref().unwrap_or(""),
    )?;
    if !contract.is_empty() {
        parse_any(&contract, Some(network_id))?;
        config.contract_address = Some(contract);
    }

    let keystore = Keystore::new(wallet_path);
    if !args.no_account && keystore.list()?.is_empty() {
        let password = new_password(&mut prompter)?;
        let address = keystore.create(&password)?;
        println!("Created account {address:#x}");
        config.from.get_or_insert_with(|| format!("{address:#x}"));
    }

    config.save()?;
    info!(path = %config.path.display(), "config written");
    println!("Config written to {}", config.path.display());
    Ok(())
}

fn ask(prompter: &mut dyn Prompter, label: &str, current: &str) -> Result<String> {
    let answer = if current.is_empty() {
        prompter.input(&format!("{label}: "))?
    } else {
        prompter.input(&format!("{label} [{current}]: "))?
    };
    Ok(if answer.is_empty() {
        current.to_string()
    } else {
        answer
    })
}

/// Passphrase entered twice.
pub fn new_password(prompter: &mut dyn Prompter) -> Result<String> {
    let password = prompter.password("Enter passphrase: ")?;
    let again = prompter.password("Repeat passphrase: ")?;
    if password != again {
        anyhow::bail!("passphrases do not match");
    }
    Ok(password)
}
