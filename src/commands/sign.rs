use crate::abi::Descriptors;
use crate::cli::SignArgs;
use crate::commands::build::print_record;
use crate::commands::keystore;
use crate::config::{Config, Overrides};
use crate::guide::TerminalPrompter;
use crate::signer::sign_record;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Sign a transaction file without touching the node.
pub async fn run(args: SignArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let descriptors = Descriptors::load()?;

    let mut record = settings.new_record()?;
    record.merge_file(&args.file, &settings.denom)?;
    print_record(&record, &descriptors, &settings.denom);
    if let Some(call) = descriptors.decode(&record.data)? {
        if call.encode()? != record.data {
            warn!(method = %call.signature(), "data carries bytes beyond the decoded call");
        }
    }

    let signer = keystore(&settings).unlock(
        record.from,
        record.credential.as_deref(),
        &mut TerminalPrompter,
    )?;
    let signed = sign_record(&record, &signer)?;

    let out = args.out.unwrap_or_else(|| signed_path(&args.file));
    fs::write(&out, format!("{}\n", signed.to_hex()))
        .with_context(|| format!("failed to write {}", out.display()))?;
    info!(tx_hash = %signed.hash, path = %out.display(), "transaction signed");
    println!("Transaction hash: {:#x}", signed.hash);
    println!("Signed transaction written to {}", out.display());
    Ok(())
}

/// `tx.json` becomes `tx.json.sign`.
fn signed_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".sign");
    PathBuf::from(name)
}
