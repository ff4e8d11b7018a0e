use crate::broadcast::{broadcast, report};
use crate::cli::BroadcastArgs;
use crate::commands::{connect, deadline};
use crate::config::{Config, Overrides};
use crate::types::bytes_from_hex;
use alloy_primitives::Bytes;
use anyhow::{Context, Result};
use std::fs;

pub async fn run(args: BroadcastArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let contents = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let raw = signed_payload(&contents)
        .with_context(|| format!("invalid signed transaction {}", args.file.display()))?;

    let client = connect(&settings)?;
    let receipt = broadcast(&client, &raw, deadline(&args.wait)).await?;
    report(&receipt)?;
    Ok(())
}

/// The first non-empty line, as hex.
fn signed_payload(contents: &str) -> Result<Bytes> {
    let line = contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .context("file is empty")?;
    bytes_from_hex(line)
}
