use crate::abi::Descriptors;
use crate::action::{Action, ActionKind};
use crate::address::parse_any;
use crate::reconcile::{check_preconditions, check_requirement, Precondition, WalletState};
use crate::record::{TxRecord, GAS_FLOOR};
use crate::types::parse_u256;
use crate::units::{parse_units, Denomination, Unit};
use alloy_primitives::{Address, Bytes, U256};
use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Attempts per prompt before the guide gives up.
pub const PROMPT_ATTEMPTS: usize = 3;

/// Source of operator answers.
pub trait Prompter {
    fn input(&mut self, prompt: &str) -> Result<String>;
    fn password(&mut self, prompt: &str) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if read == 0 {
            anyhow::bail!("stdin closed");
        }
        Ok(line.trim().to_string())
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        rpassword::prompt_password(prompt).context("failed to read passphrase")
    }
}

/// Interactive builder for a [`TxRecord`]. With a wallet state attached
/// every answer is checked against the deployed contract; without one the
/// guide runs offline and also asks for the envelope fields.
pub struct Guide<'a> {
    prompter: &'a mut dyn Prompter,
    state: Option<&'a dyn WalletState>,
    descriptors: &'a Descriptors,
    denom: &'a Denomination,
}

impl<'a> Guide<'a> {
    pub fn new(
        prompter: &'a mut dyn Prompter,
        state: Option<&'a dyn WalletState>,
        descriptors: &'a Descriptors,
        denom: &'a Denomination,
    ) -> Self {
        Self {
            prompter,
            state,
            descriptors,
            denom,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.state.is_none()
    }

    pub async fn run(&mut self, record: &mut TxRecord) -> Result<()> {
        // Chain-qualified addresses decode against the chain being signed for.
        if self.is_offline() {
            record.network_id = self.ask_chain_id(record.network_id)?;
        }
        let network_id = record.network_id;
        let wallet = self.ask_wallet(record.to, network_id)?;
        let from = self.ask_owner(wallet, record.from, network_id).await?;
        let kind = self.ask_action()?;
        let action = self.collect_action(kind, wallet, from, network_id).await?;

        record.to = Some(wallet);
        record.from = from;
        record.value = U256::ZERO;
        record.data = action.calldata(self.descriptors, wallet)?;
        record.action = Some(action);

        if self.is_offline() {
            self.ask_envelope(record)?;
        }
        debug!(action = ?kind, "guide complete");
        Ok(())
    }

    fn ask<T>(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        mut parse: impl FnMut(&str) -> Result<T>,
    ) -> Result<T> {
        let prompt = match default {
            Some(default) => format!("{prompt} [{default}]: "),
            None => format!("{prompt}: "),
        };
        let mut last_error = None;
        for attempt in 1..=PROMPT_ATTEMPTS {
            let answer = self.prompter.input(&prompt)?;
            let answer = match (answer.is_empty(), default) {
                (true, Some(default)) => default.to_string(),
                _ => answer,
            };
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    println!("{err:#} ({attempt}/{PROMPT_ATTEMPTS})");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| anyhow!("no answer"))
            .context(format!("gave up after {PROMPT_ATTEMPTS} attempts")))
    }

    fn ask_address(
        &mut self,
        prompt: &str,
        default: Option<Address>,
        network_id: u64,
    ) -> Result<Address> {
        let default = default
            .filter(|address| !address.is_zero())
            .map(|address| format!("{address:#x}"));
        self.ask(prompt, default.as_deref(), |text| {
            parse_any(text, Some(network_id))
        })
    }

    fn ask_wallet(&mut self, current: Option<Address>, network_id: u64) -> Result<Address> {
        self.ask_address("Enter the multisig wallet address", current, network_id)
    }

    async fn ask_owner(
        &mut self,
        wallet: Address,
        current: Address,
        network_id: u64,
    ) -> Result<Address> {
        for attempt in 1..=PROMPT_ATTEMPTS {
            let from = self.ask_address("Enter the owner address to send from", Some(current), network_id)?;
            match self.state {
                Some(state) if !state.is_owner(wallet, from).await? => {
                    println!("{from:#x} is not an owner of {wallet:#x} ({attempt}/{PROMPT_ATTEMPTS})");
                }
                _ => return Ok(from),
            }
        }
        anyhow::bail!("no owner address given after {PROMPT_ATTEMPTS} attempts")
    }

    fn ask_action(&mut self) -> Result<ActionKind> {
        println!("Actions:");
        for (index, kind) in ActionKind::ALL.iter().enumerate() {
            println!("  {}. {kind}", index + 1);
        }
        self.ask("Select an action", Some("1"), |text| {
            text.parse::<usize>()
                .ok()
                .and_then(ActionKind::from_index)
                .ok_or_else(|| anyhow!("choose a number between 1 and {}", ActionKind::ALL.len()))
        })
    }

    fn ask_unit(&mut self) -> Result<Unit> {
        let denom = self.denom;
        let prompt = format!("Enter the unit ({}|{})", denom.major, denom.minor);
        self.ask(&prompt, Some(denom.major.as_str()), |text| Ok(denom.parse_unit(text)?))
    }

    fn ask_amount(&mut self, prompt: &str, decimals: u8) -> Result<U256> {
        self.ask(prompt, None, |text| Ok(parse_units(text, decimals)?))
    }

    /// Prompt for the arguments of `kind` and validate them against the
    /// wallet when connected.
    pub async fn collect_action(
        &mut self,
        kind: ActionKind,
        wallet: Address,
        from: Address,
        network_id: u64,
    ) -> Result<Action> {
        match kind {
            ActionKind::Submit => {
                let destination = self.ask_address("Enter the recipient address", None, network_id)?;
                let unit = self.ask_unit()?;
                let value = self.ask_amount("Enter the amount", self.denom.exponent(unit))?;
                let message = self.prompter.input("Enter a message (optional): ")?;
                Ok(Action::Submit {
                    destination,
                    value,
                    data: Bytes::from(message.into_bytes()),
                })
            }
            ActionKind::Confirm | ActionKind::Revoke | ActionKind::Execute => {
                self.ask_transaction_id(kind, wallet, from).await
            }
            ActionKind::OwnerAdd | ActionKind::OwnerRemove | ActionKind::OwnerReplace => {
                self.ask_owner_change(kind, wallet, from, network_id).await
            }
            ActionKind::DailyLimitChange => {
                let unit = self.ask_unit()?;
                let limit = self.ask_amount("Enter the new daily limit", self.denom.exponent(unit))?;
                Ok(Action::DailyLimitChange { limit })
            }
            ActionKind::RequiredChange => self.ask_required(wallet).await,
            ActionKind::TokenTransfer => {
                let token = self.ask_address("Enter the token address", None, network_id)?;
                let recipient = self.ask_address("Enter the recipient address", None, network_id)?;
                let decimals = match self.state {
                    Some(state) => state
                        .token_decimals(token)
                        .await
                        .with_context(|| format!("failed to read decimals of {token:#x}"))?,
                    None => self.ask("Enter the token decimals", Some("18"), |text| {
                        text.parse::<u8>()
                            .map_err(|err| anyhow!("invalid decimals {text}: {err}"))
                    })?,
                };
                let amount = self.ask_amount("Enter the token amount", decimals)?;
                Ok(Action::TokenTransfer {
                    token,
                    recipient,
                    amount,
                })
            }
        }
    }

    async fn ask_transaction_id(
        &mut self,
        kind: ActionKind,
        wallet: Address,
        from: Address,
    ) -> Result<Action> {
        let verb = match kind {
            ActionKind::Confirm => "confirm",
            ActionKind::Revoke => "revoke",
            _ => "execute",
        };
        for attempt in 1..=PROMPT_ATTEMPTS {
            let id = self.ask(&format!("Enter the ID to {verb}"), None, parse_u256)?;
            let action = match kind {
                ActionKind::Confirm => Action::Confirm { id },
                ActionKind::Revoke => Action::Revoke { id },
                _ => Action::Execute { id },
            };
            match self.validate(wallet, from, &action).await? {
                None => return Ok(action),
                Some(reason) => println!("{reason} ({attempt}/{PROMPT_ATTEMPTS})"),
            }
        }
        anyhow::bail!("no valid transaction id given after {PROMPT_ATTEMPTS} attempts")
    }

    async fn ask_owner_change(
        &mut self,
        kind: ActionKind,
        wallet: Address,
        from: Address,
        network_id: u64,
    ) -> Result<Action> {
        for attempt in 1..=PROMPT_ATTEMPTS {
            let action = match kind {
                ActionKind::OwnerAdd => Action::OwnerAdd {
                    owner: self.ask_address("Enter the owner address to add", None, network_id)?,
                },
                ActionKind::OwnerRemove => Action::OwnerRemove {
                    owner: self.ask_address("Enter the owner address to remove", None, network_id)?,
                },
                _ => Action::OwnerReplace {
                    owner: self.ask_address("Enter the owner address to replace", None, network_id)?,
                    new_owner: self.ask_address("Enter the new owner address", None, network_id)?,
                },
            };
            match self.validate(wallet, from, &action).await? {
                None => return Ok(action),
                Some(reason) => println!("{reason} ({attempt}/{PROMPT_ATTEMPTS})"),
            }
        }
        anyhow::bail!("no valid owner given after {PROMPT_ATTEMPTS} attempts")
    }

    async fn ask_required(&mut self, wallet: Address) -> Result<Action> {
        let owners = match self.state {
            Some(state) => Some(state.owners(wallet).await?.len() as u64),
            None => None,
        };
        let prompt = match owners {
            Some(owners) => format!("Enter the required confirmations (1-{owners})"),
            None => "Enter the required confirmations".to_string(),
        };
        let required = self.ask(&prompt, None, |text| {
            let required = parse_u256(text)?;
            check_requirement(required, owners.unwrap_or(u64::MAX))?;
            Ok(required)
        })?;
        Ok(Action::RequiredChange { required })
    }

    /// `Some(reason)` when the wallet refuses `action` for a reason the
    /// operator can fix by answering differently.
    async fn validate(
        &self,
        wallet: Address,
        from: Address,
        action: &Action,
    ) -> Result<Option<String>> {
        let Some(state) = self.state else {
            return Ok(None);
        };
        match check_preconditions(state, wallet, from, action).await {
            Ok(()) => Ok(None),
            Err(err) => match err.downcast::<Precondition>() {
                Ok(precondition) => Ok(Some(precondition.to_string())),
                Err(err) => Err(err),
            },
        }
    }

    /// Envelope fields that a connected signer would read from the node.
    pub fn ask_envelope(&mut self, record: &mut TxRecord) -> Result<()> {
        let nonce = record.nonce.to_string();
        record.nonce = self.ask("Enter the nonce", Some(&nonce), |text| {
            text.parse::<u64>()
                .map_err(|err| anyhow!("invalid nonce {text}: {err}"))
        })?;

        let gas_price = record.gas_price.to_string();
        record.gas_price = self.ask("Enter the gas price", Some(&gas_price), |text| {
            text.parse::<u128>()
                .map_err(|err| anyhow!("invalid gas price {text}: {err}"))
        })?;

        let gas_limit = record.gas_limit.to_string();
        record.gas_limit = self.ask("Enter the gas limit", Some(&gas_limit), |text| {
            let gas_limit = text
                .parse::<u64>()
                .map_err(|err| anyhow!("invalid gas limit {text}: {err}"))?;
            if gas_limit < GAS_FLOOR {
                anyhow::bail!("gas limit must be at least {GAS_FLOOR}");
            }
            Ok(gas_limit)
        })?;
        Ok(())
    }

    pub fn ask_chain_id(&mut self, current: u64) -> Result<u64> {
        let current = current.to_string();
        self.ask("Enter the chain id", Some(&current), |text| {
            text.parse::<u64>()
                .map_err(|err| anyhow!("invalid chain id {text}: {err}"))
        })
    }
}
