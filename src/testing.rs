//! In-memory doubles for the node, the wallet contract and the terminal.

use crate::guide::Prompter;
use crate::reconcile::{WalletState, WalletTx};
use crate::record::TxRecord;
use crate::rpc::{MinedReceipt, Node};
use alloy_primitives::{address, keccak256, Address, Bytes, Log, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const WALLET: Address = address!("1000000000000000000000000000000000000001");
pub const ALICE: Address = address!("a11ce00000000000000000000000000000000000");
pub const BOB: Address = address!("b0b0000000000000000000000000000000000000");
pub const CAROL: Address = address!("ca20100000000000000000000000000000000000");

#[derive(Default)]
struct WalletData {
    owners: Vec<Address>,
    required: u64,
    daily_limit: U256,
    spent_today: U256,
    txs: Vec<WalletTx>,
    confirmations: BTreeSet<(U256, Address)>,
    token_decimals: HashMap<Address, u8>,
}

#[derive(Default)]
pub struct MockWallet {
    data: Mutex<WalletData>,
}

impl MockWallet {
    pub fn new(owners: &[Address], required: u64) -> Self {
        Self {
            data: Mutex::new(WalletData {
                owners: owners.to_vec(),
                required,
                daily_limit: U256::from(10u64).pow(U256::from(18u64)),
                ..WalletData::default()
            }),
        }
    }

    pub fn push_tx(&self, destination: Address, value: U256, executed: bool) -> U256 {
        let mut data = self.data.lock().expect("lock");
        data.txs.push(WalletTx {
            destination,
            value,
            data: Bytes::new(),
            executed,
        });
        U256::from(data.txs.len() - 1)
    }

    pub fn confirm(&self, id: U256, owner: Address) {
        self.data
            .lock()
            .expect("lock")
            .confirmations
            .insert((id, owner));
    }

    pub fn set_token_decimals(&self, token: Address, decimals: u8) {
        self.data
            .lock()
            .expect("lock")
            .token_decimals
            .insert(token, decimals);
    }

    fn confirmers_of(data: &WalletData, id: U256) -> Vec<Address> {
        data.owners
            .iter()
            .filter(|owner| data.confirmations.contains(&(id, **owner)))
            .copied()
            .collect()
    }
}

#[async_trait]
impl WalletState for MockWallet {
    async fn is_owner(&self, _wallet: Address, who: Address) -> Result<bool> {
        Ok(self.data.lock().expect("lock").owners.contains(&who))
    }

    async fn owners(&self, _wallet: Address) -> Result<Vec<Address>> {
        Ok(self.data.lock().expect("lock").owners.clone())
    }

    async fn required(&self, _wallet: Address) -> Result<U256> {
        Ok(U256::from(self.data.lock().expect("lock").required))
    }

    async fn daily_limit(&self, _wallet: Address) -> Result<U256> {
        Ok(self.data.lock().expect("lock").daily_limit)
    }

    async fn last_day(&self, _wallet: Address) -> Result<U256> {
        Ok(U256::ZERO)
    }

    async fn spent_today(&self, _wallet: Address) -> Result<U256> {
        Ok(self.data.lock().expect("lock").spent_today)
    }

    async fn max_withdraw(&self, _wallet: Address) -> Result<U256> {
        let data = self.data.lock().expect("lock");
        Ok(data.daily_limit.saturating_sub(data.spent_today))
    }

    async fn transaction_count(&self, _wallet: Address) -> Result<U256> {
        Ok(U256::from(self.data.lock().expect("lock").txs.len()))
    }

    async fn transaction(&self, _wallet: Address, id: U256) -> Result<WalletTx> {
        let data = self.data.lock().expect("lock");
        usize::try_from(id)
            .ok()
            .and_then(|index| data.txs.get(index).cloned())
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn confirmed_by(&self, _wallet: Address, id: U256, owner: Address) -> Result<bool> {
        Ok(self
            .data
            .lock()
            .expect("lock")
            .confirmations
            .contains(&(id, owner)))
    }

    async fn is_confirmed(&self, _wallet: Address, id: U256) -> Result<bool> {
        let data = self.data.lock().expect("lock");
        Ok(Self::confirmers_of(&data, id).len() as u64 >= data.required)
    }

    async fn confirmation_count(&self, _wallet: Address, id: U256) -> Result<U256> {
        let data = self.data.lock().expect("lock");
        Ok(U256::from(Self::confirmers_of(&data, id).len()))
    }

    async fn confirmers(&self, _wallet: Address, id: U256) -> Result<Vec<Address>> {
        let data = self.data.lock().expect("lock");
        Ok(Self::confirmers_of(&data, id))
    }

    async fn max_owner_count(&self, _wallet: Address) -> Result<U256> {
        Ok(U256::from(50u64))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        self.data
            .lock()
            .expect("lock")
            .token_decimals
            .get(&token)
            .copied()
            .ok_or_else(|| anyhow!("execution reverted"))
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Node double that records submissions and serves a scripted receipt.
pub struct MockNode {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub estimate: u64,
    estimate_error: Option<String>,
    estimate_hook: Option<Hook>,
    send_error: Option<String>,
    pending_polls: Option<usize>,
    receipt_error: Option<String>,
    reverted: bool,
    logs: Vec<Log>,
    sent: Mutex<Vec<Vec<u8>>>,
    estimates: AtomicUsize,
    polls: AtomicUsize,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            chain_id: 1007,
            nonce: 0,
            gas_price: 1,
            estimate: 100_000,
            estimate_error: None,
            estimate_hook: None,
            send_error: None,
            pending_polls: Some(0),
            receipt_error: None,
            reverted: false,
            logs: Vec::new(),
            sent: Mutex::new(Vec::new()),
            estimates: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }
}

impl MockNode {
    pub fn pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = Some(polls);
        self
    }

    pub fn never_mined(mut self) -> Self {
        self.pending_polls = None;
        self
    }

    pub fn fail_receipts(mut self, message: &str) -> Self {
        self.receipt_error = Some(message.to_string());
        self
    }

    pub fn reverted(mut self) -> Self {
        self.reverted = true;
        self
    }

    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    pub fn reject_sends(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    /// Fail estimation with `message` after running `hook`.
    pub fn fail_estimate(mut self, message: &str, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.estimate_error = Some(message.to_string());
        self.estimate_hook = Some(Box::new(hook));
        self
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn estimates(&self) -> usize {
        self.estimates.load(Ordering::SeqCst)
    }

    pub fn receipt_polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Node for MockNode {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn nonce(&self, _from: Address) -> Result<u64> {
        Ok(self.nonce)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _record: &TxRecord) -> Result<u64> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.estimate_hook {
            hook();
        }
        match &self.estimate_error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(self.estimate),
        }
    }

    async fn send_raw(&self, raw: &[u8]) -> Result<B256> {
        if let Some(message) = &self.send_error {
            return Err(anyhow!("{message}"));
        }
        self.sent.lock().expect("lock").push(raw.to_vec());
        Ok(keccak256(raw))
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<MinedReceipt>> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.receipt_error {
            return Err(anyhow!("{message}"));
        }
        match self.pending_polls {
            Some(pending) if poll >= pending => Ok(Some(MinedReceipt {
                tx_hash,
                block_number: Some(1),
                status: !self.reverted,
                gas_used: 21_000,
                contract_address: None,
                logs: self.logs.clone(),
            })),
            _ => Ok(None),
        }
    }
}

/// Prompter fed from fixed answers.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    passwords: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|answer| answer.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_passwords(mut self, passwords: &[&str]) -> Self {
        self.passwords = passwords.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn remaining_answers(&self) -> usize {
        self.answers.len()
    }

    pub fn remaining_passwords(&self) -> usize {
        self.passwords.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for {prompt:?}"))
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.passwords
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted password for {prompt:?}"))
    }
}
