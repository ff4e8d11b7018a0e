use crate::record::TxRecord;
use alloy_primitives::{Address, Bytes, Log, B256, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{Filter, TransactionInput, TransactionReceipt, TransactionRequest};
use alloy_sol_types::SolCall;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

#[derive(Clone)]
pub struct RpcClient {
    pub url: String,
    pub provider: RootProvider,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let parsed: url::Url = url
            .parse()
            .with_context(|| format!("invalid rpc url {url}"))?;
        let provider: RootProvider = RootProvider::new_http(parsed);
        Ok(Self {
            url: url.to_string(),
            provider,
        })
    }
}

/// A mined receipt reduced to what the client reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub status: bool,
    pub gas_used: u64,
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
}

impl From<&TransactionReceipt> for MinedReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            status: receipt.inner.status(),
            gas_used: receipt.gas_used,
            contract_address: receipt.contract_address,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }
    }
}

/// Node operations needed to fill, submit and follow a transaction.
#[async_trait]
pub trait Node: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;
    async fn nonce(&self, from: Address) -> Result<u64>;
    async fn gas_price(&self) -> Result<u128>;
    async fn estimate_gas(&self, record: &TxRecord) -> Result<u64>;
    async fn send_raw(&self, raw: &[u8]) -> Result<B256>;
    async fn receipt(&self, tx_hash: B256) -> Result<Option<MinedReceipt>>;
}

#[async_trait]
impl Node for RpcClient {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn nonce(&self, from: Address) -> Result<u64> {
        Ok(self.provider.get_transaction_count(from).pending().await?)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn estimate_gas(&self, record: &TxRecord) -> Result<u64> {
        let request = TransactionRequest {
            from: Some(record.from),
            to: record.to.map(Into::into),
            value: Some(record.value),
            input: TransactionInput::new(record.data.clone()),
            ..Default::default()
        };
        Ok(self.provider.estimate_gas(request).await?)
    }

    async fn send_raw(&self, raw: &[u8]) -> Result<B256> {
        send_raw_transaction(self, raw).await
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<MinedReceipt>> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;
        Ok(receipt.as_ref().map(MinedReceipt::from))
    }
}

pub async fn eth_call(client: &RpcClient, to: Address, data: Bytes) -> Result<Bytes> {
    let request = TransactionRequest {
        to: Some(to.into()),
        input: TransactionInput::new(data),
        ..Default::default()
    };
    Ok(client.provider.call(request).await?)
}

/// Call a view method and decode its return value.
pub async fn call_contract<C>(client: &RpcClient, to: Address, call: C) -> Result<C::Return>
where
    C: SolCall + Send + Sync,
{
    let data = eth_call(client, to, Bytes::from(call.abi_encode())).await?;
    C::abi_decode_returns(&data)
        .map_err(|err| anyhow!("failed to decode {} result: {err}", C::SIGNATURE))
}

pub async fn send_raw_transaction(client: &RpcClient, raw: &[u8]) -> Result<B256> {
    let pending = client.provider.send_raw_transaction(raw).await?;
    let tx_hash = *pending.tx_hash();
    debug!(tx_hash = %tx_hash, "raw transaction accepted");
    Ok(tx_hash)
}

pub async fn get_balance(client: &RpcClient, address: Address) -> Result<U256> {
    Ok(client.provider.get_balance(address).await?)
}

pub async fn get_block_number(client: &RpcClient) -> Result<u64> {
    Ok(client.provider.get_block_number().await?)
}

pub async fn get_logs(
    client: &RpcClient,
    address: Address,
    from: u64,
    to: u64,
) -> Result<Vec<alloy_rpc_types::Log>> {
    let filter = Filter::new().address(address).from_block(from).to_block(to);
    Ok(client.provider.get_logs(&filter).await?)
}
