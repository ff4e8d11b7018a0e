use crate::abi::Descriptors;
use crate::action::Action;
use crate::broadcast::{broadcast, submission_id};
use crate::guide::Prompter;
use crate::reconcile::{
    check_preconditions, reconcile_failure, tx_status, Satisfied, TxStatus, WalletState,
};
use crate::record::TxRecord;
use crate::rpc::{MinedReceipt, Node};
use crate::signer::{fill_envelope, ConnectedSigner, Keystore};
use crate::units::Denomination;
use alloy_primitives::{Address, U256};
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Result of proposing an action to the wallet.
#[derive(Debug)]
pub enum Outcome {
    /// `status` is the wallet transaction the action created or touched,
    /// read back after mining. A daily-limit transfer may already be
    /// executed here.
    Mined {
        receipt: MinedReceipt,
        status: Option<TxStatus>,
    },
    /// The node refused the call but the wallet already is in the state the
    /// action asked for.
    AlreadySatisfied(Satisfied),
}

/// Everything needed to turn an [`Action`] into a mined wallet transaction.
pub struct Session<'a> {
    pub node: &'a dyn Node,
    pub state: &'a dyn WalletState,
    pub keystore: &'a Keystore,
    pub descriptors: &'a Descriptors,
    pub denom: &'a Denomination,
    pub wallet: Address,
    pub deadline: Duration,
}

impl Session<'_> {
    /// Unsigned record for `action`: calldata encoded, envelope still at the
    /// template's values.
    pub fn record_for(&self, template: &TxRecord, action: Action) -> Result<TxRecord> {
        let data = action.calldata(self.descriptors, self.wallet)?;
        Ok(TxRecord {
            to: Some(self.wallet),
            value: U256::ZERO,
            data,
            action: Some(action),
            ..template.clone()
        })
    }

    /// Check the wallet, then fill the envelope from the node. Nothing is
    /// signed.
    ///
    /// Returns `Ok(Err(satisfied))` when gas estimation fails because the
    /// action's end state already holds.
    pub async fn prepare(
        &self,
        template: &TxRecord,
        action: Action,
    ) -> Result<std::result::Result<TxRecord, Satisfied>> {
        check_preconditions(self.state, self.wallet, template.from, &action).await?;
        let mut record = self.record_for(template, action)?;
        if let Err(err) = fill_envelope(self.node, &mut record).await {
            let Some(action) = record.action.as_ref() else {
                return Err(err);
            };
            let satisfied =
                reconcile_failure(self.state, self.wallet, record.from, action, err).await?;
            return Ok(Err(satisfied));
        }
        Ok(Ok(record))
    }

    pub async fn propose(
        &self,
        template: &TxRecord,
        action: Action,
        prompter: &mut dyn Prompter,
    ) -> Result<Outcome> {
        let kind = action.kind();
        let id = action.transaction_id();
        let record = match self.prepare(template, action).await? {
            Ok(record) => record,
            Err(satisfied) => return Ok(Outcome::AlreadySatisfied(satisfied)),
        };
        let signer = ConnectedSigner {
            keystore: self.keystore,
            denom: self.denom,
        };
        let signed = signer.sign(&record, prompter)?;
        info!(action = %kind, id = ?id, tx_hash = %signed.hash, "broadcasting");
        let receipt = broadcast(self.node, &signed.raw, self.deadline).await?;
        let status = match id.or_else(|| submission_id(&receipt.logs)) {
            Some(id) if receipt.status => self.final_status(id).await,
            _ => None,
        };
        Ok(Outcome::Mined { receipt, status })
    }

    /// The transaction is already mined, so a failed read is only logged.
    async fn final_status(&self, id: U256) -> Option<TxStatus> {
        match tx_status(self.state, self.wallet, id).await {
            Ok(status) => Some(status),
            Err(err) => {
                warn!(%id, %err, "failed to read wallet transaction after mining");
                None
            }
        }
    }
}
