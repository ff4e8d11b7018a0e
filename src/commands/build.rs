use crate::abi::Descriptors;
use crate::cli::BuildArgs;
use crate::commands::{connect, keystore, DEFAULT_TIMEOUT};
use crate::config::{Config, Overrides};
use crate::guide::{Guide, TerminalPrompter};
use crate::record::TxRecord;
use crate::session::Session;
use crate::signer::fill_envelope;
use crate::units::Denomination;
use anyhow::{Context, Result};
use tracing::info;

/// Build an unsigned record and write it to `--out`. Online builds read the
/// envelope from the node; offline builds ask for it.
pub async fn run(args: BuildArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let descriptors = Descriptors::load()?;
    let denom = &settings.denom;

    let mut record = settings.new_record()?;
    if let Some(input) = &args.input {
        record.merge_file(input, denom)?;
    }

    let record = if args.offline {
        if !args.no_guide {
            let mut prompter = TerminalPrompter;
            Guide::new(&mut prompter, None, &descriptors, denom)
                .run(&mut record)
                .await?;
        }
        record
    } else {
        let client = connect(&settings)?;
        if args.no_guide {
            fill_envelope(&client, &mut record).await?;
            record
        } else {
            let mut prompter = TerminalPrompter;
            Guide::new(&mut prompter, Some(&client), &descriptors, denom)
                .run(&mut record)
                .await?;
            let action = record
                .action
                .clone()
                .context("guide finished without an action")?;
            let keystore = keystore(&settings);
            let session = Session {
                node: &client,
                state: &client,
                keystore: &keystore,
                descriptors: &descriptors,
                denom,
                wallet: record.to.context("guide finished without a wallet")?,
                deadline: DEFAULT_TIMEOUT,
            };
            match session.prepare(&record, action).await? {
                Ok(prepared) => prepared,
                Err(satisfied) => {
                    println!("Nothing to do: {satisfied}");
                    return Ok(());
                }
            }
        }
    };

    print_record(&record, &descriptors, &settings.denom);
    record.save(&args.out, &settings.denom)?;
    info!(path = %args.out.display(), "transaction written");
    println!("Transaction written to {}", args.out.display());
    Ok(())
}

pub fn print_record(record: &TxRecord, descriptors: &Descriptors, denom: &Denomination) {
    for line in record.summary(denom) {
        println!("{line}");
    }
    for line in descriptors.describe(&record.data, denom) {
        println!("  {line}");
    }
}
