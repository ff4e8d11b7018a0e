use crate::abi::Submission;
use crate::rpc::{MinedReceipt, Node};
use alloy_primitives::{Log, B256, U256};
use alloy_sol_types::SolEvent;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Receipt poll interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("node rejected the transaction: {0}")]
    Rejected(String),
    #[error("transaction {tx_hash:#x} was not mined within {waited:?}")]
    DeadlineExceeded { tx_hash: B256, waited: Duration },
    /// The deadline passed while the node could not be reached.
    #[error("lost the node while waiting for {tx_hash:#x}: {message}")]
    Transport { tx_hash: B256, message: String },
    #[error("transaction {0:#x} was mined but reverted")]
    Reverted(B256),
}

/// Submit a signed transaction and wait for its receipt.
///
/// Receipt lookups that fail are retried on the next tick; only the
/// deadline ends the wait without a receipt. A deadline reached while the
/// last lookup failed is reported as a transport error.
pub async fn broadcast(
    node: &dyn Node,
    raw: &[u8],
    deadline: Duration,
) -> Result<MinedReceipt, BroadcastError> {
    let tx_hash = node
        .send_raw(raw)
        .await
        .map_err(|err| BroadcastError::Rejected(format!("{err:#}")))?;
    info!(tx_hash = %tx_hash, "transaction submitted");
    println!("Transaction hash: {tx_hash:#x}");
    wait_mined(node, tx_hash, deadline).await
}

pub async fn wait_mined(
    node: &dyn Node,
    tx_hash: B256,
    deadline: Duration,
) -> Result<MinedReceipt, BroadcastError> {
    let mut last_error = None;
    let poll = async {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            match node.receipt(tx_hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {
                    last_error = None;
                    debug!(tx_hash = %tx_hash, "transaction not yet mined");
                }
                Err(err) => {
                    warn!(tx_hash = %tx_hash, %err, "receipt lookup failed");
                    last_error = Some(format!("{err:#}"));
                }
            }
        }
    };
    let outcome = tokio::time::timeout(deadline, poll).await;
    match (outcome, last_error) {
        (Ok(receipt), _) => Ok(receipt),
        (Err(_), Some(message)) => Err(BroadcastError::Transport { tx_hash, message }),
        (Err(_), None) => Err(BroadcastError::DeadlineExceeded {
            tx_hash,
            waited: deadline,
        }),
    }
}

/// Id of the wallet transaction created by a `submitTransaction` call, read
/// from the first log of its receipt.
pub fn submission_id(logs: &[Log]) -> Option<U256> {
    let topics = logs.first()?.topics();
    if topics.first() != Some(&Submission::SIGNATURE_HASH) {
        return None;
    }
    topics.get(1).map(|topic| U256::from_be_bytes(topic.0))
}

/// Print the receipt. A reverted transaction is an error once printed.
pub fn report(receipt: &MinedReceipt) -> Result<(), BroadcastError> {
    println!(
        "Status: {}",
        if receipt.status { "success" } else { "failed" }
    );
    if let Some(block) = receipt.block_number {
        println!("Block: {block}");
    }
    println!("Gas used: {}", receipt.gas_used);
    if let Some(address) = receipt.contract_address {
        println!("Contract address: {address:#x}");
    }
    match submission_id(&receipt.logs) {
        Some(id) => println!("TransferID: {id}"),
        None => println!("No transferID get, please use transaction hash"),
    }
    if !receipt.status {
        return Err(BroadcastError::Reverted(receipt.tx_hash));
    }
    Ok(())
}
