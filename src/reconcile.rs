use crate::abi;
use crate::action::Action;
use crate::rpc::{call_contract, RpcClient};
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Contract-enforced ceiling on the owner count and thus on `required`.
pub const MAX_OWNER_COUNT: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTx {
    pub destination: Address,
    pub value: U256,
    pub data: Bytes,
    pub executed: bool,
}

/// Read-only view of a deployed multisig wallet. Every call is a fresh
/// query; nothing is cached between calls.
#[async_trait]
pub trait WalletState: Send + Sync {
    async fn is_owner(&self, wallet: Address, who: Address) -> Result<bool>;
    async fn owners(&self, wallet: Address) -> Result<Vec<Address>>;
    async fn required(&self, wallet: Address) -> Result<U256>;
    async fn daily_limit(&self, wallet: Address) -> Result<U256>;
    async fn last_day(&self, wallet: Address) -> Result<U256>;
    async fn spent_today(&self, wallet: Address) -> Result<U256>;
    async fn max_withdraw(&self, wallet: Address) -> Result<U256>;
    async fn transaction_count(&self, wallet: Address) -> Result<U256>;
    async fn transaction(&self, wallet: Address, id: U256) -> Result<WalletTx>;
    async fn confirmed_by(&self, wallet: Address, id: U256, owner: Address) -> Result<bool>;
    async fn is_confirmed(&self, wallet: Address, id: U256) -> Result<bool>;
    async fn confirmation_count(&self, wallet: Address, id: U256) -> Result<U256>;
    async fn confirmers(&self, wallet: Address, id: U256) -> Result<Vec<Address>>;
    async fn max_owner_count(&self, wallet: Address) -> Result<U256>;
    async fn token_decimals(&self, token: Address) -> Result<u8>;
}

#[async_trait]
impl WalletState for RpcClient {
    async fn is_owner(&self, wallet: Address, who: Address) -> Result<bool> {
        call_contract(self, wallet, abi::isOwnerCall { owner: who }).await
    }

    async fn owners(&self, wallet: Address) -> Result<Vec<Address>> {
        call_contract(self, wallet, abi::getOwnersCall {}).await
    }

    async fn required(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::requiredCall {}).await
    }

    async fn daily_limit(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::dailyLimitCall {}).await
    }

    async fn last_day(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::lastDayCall {}).await
    }

    async fn spent_today(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::spentTodayCall {}).await
    }

    async fn max_withdraw(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::calcMaxWithdrawCall {}).await
    }

    async fn transaction_count(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::transactionCountCall {}).await
    }

    async fn transaction(&self, wallet: Address, id: U256) -> Result<WalletTx> {
        let tx = call_contract(self, wallet, abi::transactionsCall { id }).await?;
        Ok(WalletTx {
            destination: tx.destination,
            value: tx.value,
            data: tx.data,
            executed: tx.executed,
        })
    }

    async fn confirmed_by(&self, wallet: Address, id: U256, owner: Address) -> Result<bool> {
        call_contract(self, wallet, abi::confirmationsCall { id, owner }).await
    }

    async fn is_confirmed(&self, wallet: Address, id: U256) -> Result<bool> {
        call_contract(self, wallet, abi::isConfirmedCall { transactionId: id }).await
    }

    async fn confirmation_count(&self, wallet: Address, id: U256) -> Result<U256> {
        call_contract(self, wallet, abi::getConfirmationCountCall { transactionId: id }).await
    }

    async fn confirmers(&self, wallet: Address, id: U256) -> Result<Vec<Address>> {
        call_contract(self, wallet, abi::getConfirmationsCall { transactionId: id }).await
    }

    async fn max_owner_count(&self, wallet: Address) -> Result<U256> {
        call_contract(self, wallet, abi::MAX_OWNER_COUNTCall {}).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        call_contract(self, token, abi::decimalsCall {}).await
    }
}

/// Why a proposed action was refused before reaching the node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Precondition {
    #[error("{0:#x} is not an owner of the wallet")]
    NotOwner(Address),
    #[error("transaction {id} does not exist, the wallet has {count} transactions")]
    OutOfRange { id: U256, count: U256 },
    #[error("transaction {0} is already executed")]
    AlreadyExecuted(U256),
    #[error("transaction {0} already has the required confirmations")]
    AlreadyConfirmed(U256),
    #[error("transaction {id} is already confirmed by {owner:#x}")]
    ConfirmedByCaller { id: U256, owner: Address },
    #[error("transaction {id} is not confirmed by {owner:#x}")]
    NotConfirmedByCaller { id: U256, owner: Address },
    #[error("{0:#x} is already an owner")]
    OwnerExists(Address),
    #[error("the wallet already has the maximum of {0} owners")]
    OwnerLimit(U256),
    #[error("required confirmations must be between 1 and {max}, got {value}")]
    InvalidRequirement { value: U256, max: U256 },
}

/// Refuse `action` from `from` if the wallet's current state makes it fail.
pub async fn check_preconditions(
    state: &dyn WalletState,
    wallet: Address,
    from: Address,
    action: &Action,
) -> Result<()> {
    if !state.is_owner(wallet, from).await? {
        return Err(Precondition::NotOwner(from).into());
    }

    match action {
        Action::Confirm { id } => {
            check_pending(state, wallet, *id).await?;
            if state.is_confirmed(wallet, *id).await? {
                return Err(Precondition::AlreadyConfirmed(*id).into());
            }
            if state.confirmed_by(wallet, *id, from).await? {
                return Err(Precondition::ConfirmedByCaller { id: *id, owner: from }.into());
            }
        }
        Action::Revoke { id } => {
            check_pending(state, wallet, *id).await?;
            if !state.confirmed_by(wallet, *id, from).await? {
                return Err(Precondition::NotConfirmedByCaller { id: *id, owner: from }.into());
            }
        }
        Action::Execute { id } => check_pending(state, wallet, *id).await?,
        Action::OwnerAdd { owner } => {
            if state.is_owner(wallet, *owner).await? {
                return Err(Precondition::OwnerExists(*owner).into());
            }
            let limit = state.max_owner_count(wallet).await?;
            if U256::from(state.owners(wallet).await?.len()) >= limit {
                return Err(Precondition::OwnerLimit(limit).into());
            }
        }
        Action::OwnerRemove { owner } => {
            if !state.is_owner(wallet, *owner).await? {
                return Err(Precondition::NotOwner(*owner).into());
            }
        }
        Action::OwnerReplace { owner, new_owner } => {
            if !state.is_owner(wallet, *owner).await? {
                return Err(Precondition::NotOwner(*owner).into());
            }
            if state.is_owner(wallet, *new_owner).await? {
                return Err(Precondition::OwnerExists(*new_owner).into());
            }
        }
        Action::RequiredChange { required } => {
            let owners = state.owners(wallet).await?.len() as u64;
            check_requirement(*required, owners)?;
        }
        Action::Submit { .. } | Action::DailyLimitChange { .. } | Action::TokenTransfer { .. } => {}
    }
    debug!(action = ?action.kind(), "preconditions hold");
    Ok(())
}

/// `required` must lie in `1..=min(owners, 50)`.
pub fn check_requirement(required: U256, owners: u64) -> Result<(), Precondition> {
    let max = U256::from(owners.min(MAX_OWNER_COUNT));
    if required.is_zero() || required > max {
        return Err(Precondition::InvalidRequirement {
            value: required,
            max,
        });
    }
    Ok(())
}

/// `id` names an existing transaction that has not run yet.
pub async fn check_pending(state: &dyn WalletState, wallet: Address, id: U256) -> Result<()> {
    check_range(state, wallet, id).await?;
    if state.transaction(wallet, id).await?.executed {
        return Err(Precondition::AlreadyExecuted(id).into());
    }
    Ok(())
}

pub async fn check_range(state: &dyn WalletState, wallet: Address, id: U256) -> Result<()> {
    let count = state.transaction_count(wallet).await?;
    if id >= count {
        return Err(Precondition::OutOfRange { id, count }.into());
    }
    Ok(())
}

/// The end state an action aims for, found to hold already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Satisfied {
    ConfirmedBy { id: U256, owner: Address },
    Revoked { id: U256, owner: Address },
    Executed(U256),
    IsOwner(Address),
    NotOwner(Address),
    Replaced { owner: Address, new_owner: Address },
    Required(U256),
    DailyLimit(U256),
}

impl fmt::Display for Satisfied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Satisfied::ConfirmedBy { id, owner } => {
                write!(f, "transaction {id} is already confirmed by {owner:#x}")
            }
            Satisfied::Revoked { id, owner } => {
                write!(f, "transaction {id} is not confirmed by {owner:#x}")
            }
            Satisfied::Executed(id) => write!(f, "transaction {id} is already executed"),
            Satisfied::IsOwner(owner) => write!(f, "{owner:#x} is already an owner"),
            Satisfied::NotOwner(owner) => write!(f, "{owner:#x} is no longer an owner"),
            Satisfied::Replaced { owner, new_owner } => {
                write!(f, "{owner:#x} is already replaced by {new_owner:#x}")
            }
            Satisfied::Required(value) => write!(f, "required is already {value}"),
            Satisfied::DailyLimit(value) => write!(f, "daily limit is already {value}"),
        }
    }
}

/// After a mutating call was rejected, re-read the wallet and report
/// whether the action's end state already holds. Rejections that leave the
/// goal unmet are returned unchanged.
pub async fn reconcile_failure(
    state: &dyn WalletState,
    wallet: Address,
    from: Address,
    action: &Action,
    error: anyhow::Error,
) -> Result<Satisfied> {
    let satisfied = match action {
        Action::Confirm { id } => {
            if state.confirmed_by(wallet, *id, from).await? {
                Some(Satisfied::ConfirmedBy { id: *id, owner: from })
            } else if state.transaction(wallet, *id).await?.executed {
                Some(Satisfied::Executed(*id))
            } else {
                None
            }
        }
        Action::Revoke { id } => (!state.confirmed_by(wallet, *id, from).await?)
            .then_some(Satisfied::Revoked { id: *id, owner: from }),
        Action::Execute { id } => state
            .transaction(wallet, *id)
            .await?
            .executed
            .then_some(Satisfied::Executed(*id)),
        Action::OwnerAdd { owner } => state
            .is_owner(wallet, *owner)
            .await?
            .then_some(Satisfied::IsOwner(*owner)),
        Action::OwnerRemove { owner } => (!state.is_owner(wallet, *owner).await?)
            .then_some(Satisfied::NotOwner(*owner)),
        Action::OwnerReplace { owner, new_owner } => {
            let replaced = !state.is_owner(wallet, *owner).await?
                && state.is_owner(wallet, *new_owner).await?;
            replaced.then_some(Satisfied::Replaced {
                owner: *owner,
                new_owner: *new_owner,
            })
        }
        Action::RequiredChange { required } => (state.required(wallet).await? == *required)
            .then_some(Satisfied::Required(*required)),
        Action::DailyLimitChange { limit } => (state.daily_limit(wallet).await? == *limit)
            .then_some(Satisfied::DailyLimit(*limit)),
        Action::Submit { .. } | Action::TokenTransfer { .. } => None,
    };

    match satisfied {
        Some(satisfied) => {
            info!(%satisfied, "rejected call is a no-op");
            Ok(satisfied)
        }
        None => Err(error),
    }
}

/// Where a wallet transaction stands. Execution is terminal and may happen
/// below the threshold when the value fits in the daily allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unconfirmed,
    Confirmed,
    Executed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatus {
    pub id: U256,
    pub tx: WalletTx,
    pub confirmations: U256,
    pub required: U256,
    pub confirmed_by: Vec<Address>,
}

impl TxStatus {
    pub fn is_confirmed(&self) -> bool {
        self.confirmations >= self.required
    }

    pub fn phase(&self) -> Phase {
        if self.tx.executed {
            Phase::Executed
        } else if self.is_confirmed() {
            Phase::Confirmed
        } else {
            Phase::Unconfirmed
        }
    }

    pub fn confirmation_label(&self) -> String {
        let label = if self.is_confirmed() {
            "Confirmed"
        } else {
            "Unconfirmed"
        };
        format!("{label}({}/{})", self.confirmations, self.required)
    }

    pub fn execution_label(&self) -> &'static str {
        if self.tx.executed {
            "Executed"
        } else {
            "Pending"
        }
    }
}

pub async fn tx_status(state: &dyn WalletState, wallet: Address, id: U256) -> Result<TxStatus> {
    check_range(state, wallet, id).await?;
    let tx = state.transaction(wallet, id).await?;
    let confirmations = state.confirmation_count(wallet, id).await?;
    let required = state.required(wallet).await?;
    let confirmed_by = state.confirmers(wallet, id).await?;
    Ok(TxStatus {
        id,
        tx,
        confirmations,
        required,
        confirmed_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockWallet, ALICE, BOB, CAROL, WALLET};

    fn precondition(err: anyhow::Error) -> Precondition {
        err.downcast::<Precondition>().expect("precondition error")
    }

    #[tokio::test]
    async fn non_owner_is_refused() {
        let wallet = MockWallet::new(&[ALICE, BOB], 2);
        let err = check_preconditions(&wallet, WALLET, CAROL, &Action::Execute { id: U256::ZERO })
            .await
            .unwrap_err();
        assert_eq!(precondition(err), Precondition::NotOwner(CAROL));
    }

    #[tokio::test]
    async fn confirm_at_transaction_count_is_out_of_range() {
        let wallet = MockWallet::new(&[ALICE, BOB], 2);
        wallet.push_tx(BOB, U256::from(1u64), false);
        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::Confirm { id: U256::from(1u64) })
            .await
            .unwrap_err();
        assert_eq!(
            precondition(err),
            Precondition::OutOfRange {
                id: U256::from(1u64),
                count: U256::from(1u64)
            }
        );
    }

    #[tokio::test]
    async fn execute_of_executed_transaction_is_refused() {
        let wallet = MockWallet::new(&[ALICE, BOB], 2);
        wallet.push_tx(BOB, U256::from(1u64), true);
        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::Execute { id: U256::ZERO })
            .await
            .unwrap_err();
        assert_eq!(precondition(err), Precondition::AlreadyExecuted(U256::ZERO));
    }

    #[tokio::test]
    async fn confirm_and_revoke_follow_caller_flag() {
        let wallet = MockWallet::new(&[ALICE, BOB, CAROL], 3);
        wallet.push_tx(BOB, U256::from(1u64), false);
        let id = U256::ZERO;

        check_preconditions(&wallet, WALLET, ALICE, &Action::Confirm { id })
            .await
            .expect("confirm allowed");
        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::Revoke { id })
            .await
            .unwrap_err();
        assert_eq!(
            precondition(err),
            Precondition::NotConfirmedByCaller { id, owner: ALICE }
        );

        wallet.confirm(id, ALICE);
        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::Confirm { id })
            .await
            .unwrap_err();
        assert_eq!(
            precondition(err),
            Precondition::ConfirmedByCaller { id, owner: ALICE }
        );
        check_preconditions(&wallet, WALLET, ALICE, &Action::Revoke { id })
            .await
            .expect("revoke allowed");
    }

    #[tokio::test]
    async fn confirm_of_fully_confirmed_transaction_is_refused() {
        let wallet = MockWallet::new(&[ALICE, BOB, CAROL], 2);
        wallet.push_tx(BOB, U256::from(1u64), false);
        wallet.confirm(U256::ZERO, BOB);
        wallet.confirm(U256::ZERO, CAROL);
        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::Confirm { id: U256::ZERO })
            .await
            .unwrap_err();
        assert_eq!(precondition(err), Precondition::AlreadyConfirmed(U256::ZERO));
    }

    #[tokio::test]
    async fn owner_changes_check_membership() {
        let wallet = MockWallet::new(&[ALICE, BOB], 1);
        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::OwnerAdd { owner: BOB })
            .await
            .unwrap_err();
        assert_eq!(precondition(err), Precondition::OwnerExists(BOB));

        let err = check_preconditions(&wallet, WALLET, ALICE, &Action::OwnerRemove { owner: CAROL })
            .await
            .unwrap_err();
        assert_eq!(precondition(err), Precondition::NotOwner(CAROL));

        check_preconditions(
            &wallet,
            WALLET,
            ALICE,
            &Action::OwnerReplace {
                owner: BOB,
                new_owner: CAROL,
            },
        )
        .await
        .expect("replace allowed");
    }

    #[tokio::test]
    async fn requirement_bounded_by_owner_count() {
        let wallet = MockWallet::new(&[ALICE, BOB], 1);
        for (value, ok) in [(0u64, false), (1, true), (2, true), (3, false)] {
            let result = check_preconditions(
                &wallet,
                WALLET,
                ALICE,
                &Action::RequiredChange {
                    required: U256::from(value),
                },
            )
            .await;
            assert_eq!(result.is_ok(), ok, "required {value}");
        }
        assert!(check_requirement(U256::from(50u64), 60).is_ok());
        assert!(check_requirement(U256::from(51u64), 60).is_err());
    }

    #[tokio::test]
    async fn failure_is_reinterpreted_only_when_goal_holds() {
        let wallet = MockWallet::new(&[ALICE, BOB], 2);
        wallet.push_tx(BOB, U256::from(1u64), false);
        let id = U256::ZERO;

        let err = reconcile_failure(
            &wallet,
            WALLET,
            ALICE,
            &Action::Confirm { id },
            anyhow::anyhow!("insufficient funds"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "insufficient funds");

        wallet.confirm(id, ALICE);
        let satisfied = reconcile_failure(
            &wallet,
            WALLET,
            ALICE,
            &Action::Confirm { id },
            anyhow::anyhow!("gas required exceeds allowance"),
        )
        .await
        .expect("already confirmed");
        assert_eq!(satisfied, Satisfied::ConfirmedBy { id, owner: ALICE });

        let err = reconcile_failure(
            &wallet,
            WALLET,
            ALICE,
            &Action::Submit {
                destination: BOB,
                value: U256::from(1u64),
                data: Bytes::new(),
            },
            anyhow::anyhow!("gas required exceeds allowance"),
        )
        .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn status_treats_daily_limit_execution_as_terminal() {
        let wallet = MockWallet::new(&[ALICE, BOB, CAROL], 3);
        wallet.push_tx(BOB, U256::from(1u64), true);
        wallet.confirm(U256::ZERO, ALICE);

        let status = tx_status(&wallet, WALLET, U256::ZERO).await.expect("status");
        assert_eq!(status.phase(), Phase::Executed);
        assert_eq!(status.confirmation_label(), "Unconfirmed(1/3)");
        assert_eq!(status.execution_label(), "Executed");
        assert_eq!(status.confirmed_by, vec![ALICE]);

        let err = tx_status(&wallet, WALLET, U256::from(1u64)).await.unwrap_err();
        assert!(err.downcast_ref::<Precondition>().is_some());
    }
}
