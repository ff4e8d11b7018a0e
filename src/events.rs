//! Wallet event subscription.
//!
//! A single producer task polls the node for the wallet's logs and forwards
//! decoded events to one consumer. The task ends when the consumer drops its
//! receiver.

use crate::abi::{format_value, MethodSet};
use crate::rpc::{get_block_number, get_logs, RpcClient};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Log, B256};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// A log together with where it was mined.
#[derive(Debug, Clone)]
pub struct SourcedLog {
    pub block_number: Option<u64>,
    pub tx_hash: Option<B256>,
    pub log: Log,
}

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn latest_block(&self) -> Result<u64>;
    async fn logs(&self, address: Address, from: u64, to: u64) -> Result<Vec<SourcedLog>>;
}

#[async_trait]
impl LogSource for RpcClient {
    async fn latest_block(&self) -> Result<u64> {
        get_block_number(self).await
    }

    async fn logs(&self, address: Address, from: u64, to: u64) -> Result<Vec<SourcedLog>> {
        Ok(get_logs(self, address, from, to)
            .await?
            .into_iter()
            .map(|log| SourcedLog {
                block_number: log.block_number,
                tx_hash: log.transaction_hash,
                log: log.inner,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEvent {
    pub name: String,
    pub block_number: Option<u64>,
    pub tx_hash: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl WalletEvent {
    fn new(name: String, source: &SourcedLog, fields: Vec<(String, DynSolValue)>) -> Self {
        Self {
            name,
            block_number: source.block_number,
            tx_hash: source.tx_hash.map(|hash| format!("{hash:#x}")),
            fields: fields
                .iter()
                .map(|(name, value)| (name.clone(), format_value(value)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub wallet: Address,
    /// Start here instead of at the current head.
    pub from_block: Option<u64>,
    pub poll: Duration,
}

/// Spawn the producer. Events arrive in block order on the returned
/// receiver; drop it to stop the task.
pub fn subscribe<S>(
    source: Arc<S>,
    events: MethodSet,
    options: WatchOptions,
) -> (mpsc::Receiver<WalletEvent>, JoinHandle<()>)
where
    S: LogSource + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = tokio::spawn(produce(source, events, options, tx));
    (rx, handle)
}

async fn produce<S>(
    source: Arc<S>,
    events: MethodSet,
    options: WatchOptions,
    tx: mpsc::Sender<WalletEvent>,
) where
    S: LogSource + ?Sized,
{
    let mut next = options.from_block;
    loop {
        match poll_once(source.as_ref(), &events, &options, &mut next, &tx).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => warn!(%err, "log poll failed"),
        }
        tokio::select! {
            _ = tx.closed() => return,
            _ = tokio::time::sleep(options.poll) => {}
        }
    }
}

/// One round of polling. `Ok(false)` means the consumer is gone.
async fn poll_once<S>(
    source: &S,
    events: &MethodSet,
    options: &WatchOptions,
    next: &mut Option<u64>,
    tx: &mpsc::Sender<WalletEvent>,
) -> Result<bool>
where
    S: LogSource + ?Sized,
{
    let latest = source.latest_block().await?;
    let from = match *next {
        Some(from) => from,
        None => {
            *next = Some(latest + 1);
            debug!(block = latest, "watching from head");
            return Ok(true);
        }
    };
    if latest < from {
        return Ok(true);
    }

    for sourced in source.logs(options.wallet, from, latest).await? {
        match events.decode_event(&sourced.log.data) {
            Ok(Some(decoded)) => {
                let event = WalletEvent::new(decoded.name, &sourced, decoded.fields);
                if tx.send(event).await.is_err() {
                    return Ok(false);
                }
            }
            Ok(None) => debug!(topics = ?sourced.log.topics(), "skipping unknown log"),
            Err(err) => warn!(%err, "failed to decode log"),
        }
    }
    *next = Some(latest + 1);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ALICE, WALLET};
    use alloy_primitives::{keccak256, Bytes, LogData, U256};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedChain {
        head: AtomicU64,
        logs: Mutex<Vec<(u64, Log)>>,
        queries: Mutex<Vec<(u64, u64)>>,
        head_calls: AtomicUsize,
    }

    impl ScriptedChain {
        fn mine(&self, block: u64, log: Log) {
            self.logs.lock().expect("lock").push((block, log));
            self.head.fetch_max(block, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LogSource for ScriptedChain {
        async fn latest_block(&self) -> Result<u64> {
            self.head_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.head.load(Ordering::SeqCst))
        }

        async fn logs(&self, address: Address, from: u64, to: u64) -> Result<Vec<SourcedLog>> {
            self.queries.lock().expect("lock").push((from, to));
            Ok(self
                .logs
                .lock()
                .expect("lock")
                .iter()
                .filter(|(block, log)| (from..=to).contains(block) && log.address == address)
                .map(|(block, log)| SourcedLog {
                    block_number: Some(*block),
                    tx_hash: None,
                    log: log.clone(),
                })
                .collect())
        }
    }

    fn word(value: U256) -> B256 {
        B256::from(value.to_be_bytes::<32>())
    }

    fn confirmation(owner: Address, id: u64) -> Log {
        Log {
            address: WALLET,
            data: LogData::new_unchecked(
                vec![
                    keccak256("Confirmation(address,uint256)"),
                    owner.into_word(),
                    word(U256::from(id)),
                ],
                Bytes::new(),
            ),
        }
    }

    fn deposit(owner: Address, value: u64) -> Log {
        Log {
            address: WALLET,
            data: LogData::new_unchecked(
                vec![keccak256("Deposit(address,uint256)"), owner.into_word()],
                Bytes::from(word(U256::from(value)).to_vec()),
            ),
        }
    }

    fn options(from_block: Option<u64>) -> WatchOptions {
        WatchOptions {
            wallet: WALLET,
            from_block,
            poll: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_decoded_events_in_order() {
        let chain = Arc::new(ScriptedChain::default());
        chain.mine(3, confirmation(ALICE, 7));
        chain.mine(4, deposit(ALICE, 1000));
        let unknown = Log {
            address: WALLET,
            data: LogData::new_unchecked(vec![keccak256("Other()")], Bytes::new()),
        };
        chain.mine(4, unknown);

        let (mut rx, handle) = subscribe(
            Arc::clone(&chain),
            MethodSet::wallet().expect("abi"),
            options(Some(1)),
        );

        let first = rx.recv().await.expect("confirmation");
        assert_eq!(first.name, "Confirmation");
        assert_eq!(first.block_number, Some(3));
        assert_eq!(first.fields.get("transactionId").map(String::as_str), Some("7"));
        assert_eq!(
            first.fields.get("sender").map(String::as_str),
            Some(format!("{ALICE:#x}").as_str())
        );

        let second = rx.recv().await.expect("deposit");
        assert_eq!(second.name, "Deposit");
        assert_eq!(second.fields.get("value").map(String::as_str), Some("1000"));

        chain.mine(6, confirmation(ALICE, 8));
        let third = rx.recv().await.expect("later confirmation");
        assert_eq!(third.block_number, Some(6));
        assert_eq!(chain.queries.lock().expect("lock")[..2], [(1, 4), (5, 6)]);

        drop(rx);
        handle.await.expect("producer stops");
    }

    #[tokio::test(start_paused = true)]
    async fn starts_at_head_when_no_block_given() {
        let chain = Arc::new(ScriptedChain::default());
        chain.mine(10, confirmation(ALICE, 1));

        let (mut rx, handle) = subscribe(
            Arc::clone(&chain),
            MethodSet::wallet().expect("abi"),
            options(None),
        );
        tokio::time::sleep(Duration::from_millis(150)).await;
        chain.mine(11, confirmation(ALICE, 2));

        let event = rx.recv().await.expect("event");
        assert_eq!(event.fields.get("transactionId").map(String::as_str), Some("2"));
        drop(rx);
        handle.await.expect("producer stops");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_receiver_stops_idle_producer() {
        let chain = Arc::new(ScriptedChain::default());
        let (rx, handle) = subscribe(
            Arc::clone(&chain),
            MethodSet::wallet().expect("abi"),
            options(None),
        );
        tokio::time::sleep(Duration::from_millis(250)).await;
        drop(rx);
        handle.await.expect("producer stops");
        let calls = chain.head_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(chain.head_calls.load(Ordering::SeqCst), calls);
    }
}
