use crate::abi::Descriptors;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Result;
use std::fmt;

/// A multisig intent with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Submit {
        destination: Address,
        value: U256,
        data: Bytes,
    },
    Confirm {
        id: U256,
    },
    Revoke {
        id: U256,
    },
    Execute {
        id: U256,
    },
    OwnerAdd {
        owner: Address,
    },
    OwnerRemove {
        owner: Address,
    },
    OwnerReplace {
        owner: Address,
        new_owner: Address,
    },
    DailyLimitChange {
        limit: U256,
    },
    RequiredChange {
        required: U256,
    },
    TokenTransfer {
        token: Address,
        recipient: Address,
        amount: U256,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Submit,
    Confirm,
    Revoke,
    Execute,
    OwnerAdd,
    OwnerRemove,
    OwnerReplace,
    DailyLimitChange,
    RequiredChange,
    TokenTransfer,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Submit,
        ActionKind::Confirm,
        ActionKind::Revoke,
        ActionKind::Execute,
        ActionKind::OwnerAdd,
        ActionKind::OwnerRemove,
        ActionKind::OwnerReplace,
        ActionKind::DailyLimitChange,
        ActionKind::RequiredChange,
        ActionKind::TokenTransfer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Submit => "Submit a transfer",
            ActionKind::Confirm => "Confirm a transaction",
            ActionKind::Revoke => "Revoke a confirmation",
            ActionKind::Execute => "Execute a confirmed transaction",
            ActionKind::OwnerAdd => "Add an owner",
            ActionKind::OwnerRemove => "Remove an owner",
            ActionKind::OwnerReplace => "Replace an owner",
            ActionKind::DailyLimitChange => "Change the daily limit",
            ActionKind::RequiredChange => "Change the required confirmations",
            ActionKind::TokenTransfer => "Transfer a token",
        }
    }

    /// Menu position, starting at 1.
    pub fn from_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Submit { .. } => ActionKind::Submit,
            Action::Confirm { .. } => ActionKind::Confirm,
            Action::Revoke { .. } => ActionKind::Revoke,
            Action::Execute { .. } => ActionKind::Execute,
            Action::OwnerAdd { .. } => ActionKind::OwnerAdd,
            Action::OwnerRemove { .. } => ActionKind::OwnerRemove,
            Action::OwnerReplace { .. } => ActionKind::OwnerReplace,
            Action::DailyLimitChange { .. } => ActionKind::DailyLimitChange,
            Action::RequiredChange { .. } => ActionKind::RequiredChange,
            Action::TokenTransfer { .. } => ActionKind::TokenTransfer,
        }
    }

    /// Name of the contract method carrying this action's arguments.
    pub fn method(&self) -> &'static str {
        match self {
            Action::Submit { .. } => "submitTransaction",
            Action::Confirm { .. } => "confirmTransaction",
            Action::Revoke { .. } => "revokeConfirmation",
            Action::Execute { .. } => "executeTransaction",
            Action::OwnerAdd { .. } => "addOwner",
            Action::OwnerRemove { .. } => "removeOwner",
            Action::OwnerReplace { .. } => "replaceOwner",
            Action::DailyLimitChange { .. } => "changeDailyLimit",
            Action::RequiredChange { .. } => "changeRequirement",
            Action::TokenTransfer { .. } => "transfer",
        }
    }

    pub fn params(&self) -> Vec<DynSolValue> {
        match self {
            Action::Submit {
                destination,
                value,
                data,
            } => vec![
                DynSolValue::from(*destination),
                DynSolValue::from(*value),
                DynSolValue::Bytes(data.to_vec()),
            ],
            Action::Confirm { id } | Action::Revoke { id } | Action::Execute { id } => {
                vec![DynSolValue::from(*id)]
            }
            Action::OwnerAdd { owner } | Action::OwnerRemove { owner } => {
                vec![DynSolValue::from(*owner)]
            }
            Action::OwnerReplace { owner, new_owner } => {
                vec![DynSolValue::from(*owner), DynSolValue::from(*new_owner)]
            }
            Action::DailyLimitChange { limit } => vec![DynSolValue::from(*limit)],
            Action::RequiredChange { required } => vec![DynSolValue::from(*required)],
            Action::TokenTransfer {
                recipient, amount, ..
            } => vec![DynSolValue::from(*recipient), DynSolValue::from(*amount)],
        }
    }

    pub fn transaction_id(&self) -> Option<U256> {
        match self {
            Action::Confirm { id } | Action::Revoke { id } | Action::Execute { id } => Some(*id),
            _ => None,
        }
    }

    /// Calldata for a transaction sent to `wallet`.
    ///
    /// Owner management and limit changes are only callable by the wallet
    /// itself, and token transfers originate from the wallet's balance, so
    /// both are proposed through `submitTransaction` with zero value.
    pub fn calldata(&self, descriptors: &Descriptors, wallet: Address) -> Result<Bytes> {
        let params = self.params();
        match self {
            Action::Submit { .. }
            | Action::Confirm { .. }
            | Action::Revoke { .. }
            | Action::Execute { .. } => descriptors.wallet.encode(self.method(), &params),
            Action::OwnerAdd { .. }
            | Action::OwnerRemove { .. }
            | Action::OwnerReplace { .. }
            | Action::DailyLimitChange { .. }
            | Action::RequiredChange { .. } => {
                let inner = descriptors.wallet.encode(self.method(), &params)?;
                propose(descriptors, wallet, inner)
            }
            Action::TokenTransfer { token, .. } => {
                let inner = descriptors.erc20.encode(self.method(), &params)?;
                propose(descriptors, *token, inner)
            }
        }
    }
}

fn propose(descriptors: &Descriptors, destination: Address, inner: Bytes) -> Result<Bytes> {
    descriptors.wallet.encode(
        "submitTransaction",
        &[
            DynSolValue::from(destination),
            DynSolValue::from(U256::ZERO),
            DynSolValue::Bytes(inner.to_vec()),
        ],
    )
}
