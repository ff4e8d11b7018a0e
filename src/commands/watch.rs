use crate::abi::MethodSet;
use crate::cli::WatchArgs;
use crate::commands::connect;
use crate::config::{Config, Overrides};
use crate::events::{subscribe, WalletEvent, WatchOptions};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Print wallet events until the stream ends or `--timeout-ms` elapses.
pub async fn run(args: WatchArgs, config: Config, overrides: Overrides) -> Result<()> {
    let settings = config.resolve(&overrides);
    let wallet = settings.contract()?;
    let client = Arc::new(connect(&settings)?);
    let options = WatchOptions {
        wallet,
        from_block: args.from_block,
        poll: Duration::from_millis(args.poll_ms.unwrap_or(1_000)),
    };

    info!(wallet = %wallet, from_block = ?args.from_block, "watching wallet events");
    let (mut events, handle) = subscribe(client, MethodSet::wallet()?, options);
    let deadline = args
        .timeout_ms
        .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    info!("watch timeout reached");
                    break;
                }
            },
            None => events.recv().await,
        };
        match next {
            Some(event) => emit_event(args.json, &event),
            None => break,
        }
    }

    drop(events);
    handle.await?;
    Ok(())
}

fn emit_event(json: bool, event: &WalletEvent) {
    if json {
        println!("{}", serde_json::to_string(event).unwrap_or_default());
        return;
    }
    let block = event
        .block_number
        .map_or_else(|| "pending".to_string(), |block| block.to_string());
    let fields: Vec<String> = event
        .fields
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    println!("[{block}] {} {}", event.name, fields.join(" "));
}
