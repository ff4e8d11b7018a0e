use crate::commands;
use crate::config::{Config, Overrides};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "msw",
    version,
    about = "Command line client for MultiSigWalletWithDailyLimit"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Keystore directory.
    #[arg(long, global = true)]
    pub wallet_path: Option<PathBuf>,

    #[arg(long, global = true)]
    pub contract_address: Option<String>,

    /// Owner address that signs.
    #[arg(long, global = true)]
    pub from: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        let overrides = Overrides {
            rpc_url: self.rpc_url,
            wallet_path: self.wallet_path,
            contract_address: self.contract_address,
            from: self.from,
        };

        match self.command {
            Command::Init(args) => commands::init::run(args, config, overrides).await,
            Command::Account(cmd) => cmd.run(config, overrides).await,
            Command::Info(args) => commands::info::run(args, config, overrides).await,
            Command::Tx(cmd) => cmd.run(config, overrides).await,
            Command::Owner(cmd) => cmd.run(config, overrides).await,
            Command::Update(cmd) => cmd.run(config, overrides).await,
            Command::Build(args) => commands::build::run(args, config, overrides).await,
            Command::Sign(args) => commands::sign::run(args, config, overrides).await,
            Command::Broadcast(args) => commands::broadcast::run(args, config, overrides).await,
            Command::Watch(args) => commands::watch::run(args, config, overrides).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a config file interactively.
    Init(InitArgs),
    Account(AccountCommand),
    /// Show the wallet, or one of its transactions.
    Info(InfoArgs),
    Tx(TxCommand),
    Owner(OwnerCommand),
    Update(UpdateCommand),
    /// Build an unsigned transaction file.
    Build(BuildArgs),
    /// Sign a transaction file.
    Sign(SignArgs),
    /// Submit a signed transaction and wait for its receipt.
    Broadcast(BroadcastArgs),
    /// Stream wallet events.
    Watch(WatchArgs),
}

#[derive(Parser, Debug)]
pub struct AccountCommand {
    #[command(subcommand)]
    pub command: AccountSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountSubcommand {
    New(AccountNewArgs),
    List(AccountListArgs),
    Balance(AccountBalanceArgs),
    /// Convert between hex and chain-qualified addresses.
    Convert(AccountConvertArgs),
}

impl AccountCommand {
    pub async fn run(self, config: Config, overrides: Overrides) -> Result<()> {
        match self.command {
            AccountSubcommand::New(args) => commands::account::run_new(args, config, overrides).await,
            AccountSubcommand::List(args) => {
                commands::account::run_list(args, config, overrides).await
            }
            AccountSubcommand::Balance(args) => {
                commands::account::run_balance(args, config, overrides).await
            }
            AccountSubcommand::Convert(args) => {
                commands::account::run_convert(args, config, overrides).await
            }
        }
    }
}

#[derive(Parser, Debug)]
pub struct TxCommand {
    #[command(subcommand)]
    pub command: TxSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TxSubcommand {
    /// Propose a value transfer from the wallet.
    Submit(TxSubmitArgs),
    Confirm(TxIdArgs),
    Revoke(TxIdArgs),
    Execute(TxIdArgs),
    List(TxListArgs),
}

impl TxCommand {
    pub async fn run(self, config: Config, overrides: Overrides) -> Result<()> {
        match self.command {
            TxSubcommand::Submit(args) => commands::tx::run_submit(args, config, overrides).await,
            TxSubcommand::Confirm(args) => commands::tx::run_confirm(args, config, overrides).await,
            TxSubcommand::Revoke(args) => commands::tx::run_revoke(args, config, overrides).await,
            TxSubcommand::Execute(args) => commands::tx::run_execute(args, config, overrides).await,
            TxSubcommand::List(args) => commands::tx::run_list(args, config, overrides).await,
        }
    }
}

#[derive(Parser, Debug)]
pub struct OwnerCommand {
    #[command(subcommand)]
    pub command: OwnerSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum OwnerSubcommand {
    List(OwnerListArgs),
    Check(OwnerCheckArgs),
    Add(OwnerChangeArgs),
    Remove(OwnerChangeArgs),
    Replace(OwnerReplaceArgs),
}

impl OwnerCommand {
    pub async fn run(self, config: Config, overrides: Overrides) -> Result<()> {
        match self.command {
            OwnerSubcommand::List(args) => commands::owner::run_list(args, config, overrides).await,
            OwnerSubcommand::Check(args) => commands::owner::run_check(args, config, overrides).await,
            OwnerSubcommand::Add(args) => commands::owner::run_add(args, config, overrides).await,
            OwnerSubcommand::Remove(args) => {
                commands::owner::run_remove(args, config, overrides).await
            }
            OwnerSubcommand::Replace(args) => {
                commands::owner::run_replace(args, config, overrides).await
            }
        }
    }
}

#[derive(Parser, Debug)]
pub struct UpdateCommand {
    #[command(subcommand)]
    pub command: UpdateSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UpdateSubcommand {
    #[command(name = "dailylimit")]
    DailyLimit(UpdateDailyLimitArgs),
    Required(UpdateRequiredArgs),
}

impl UpdateCommand {
    pub async fn run(self, config: Config, overrides: Overrides) -> Result<()> {
        match self.command {
            UpdateSubcommand::DailyLimit(args) => {
                commands::update::run_daily_limit(args, config, overrides).await
            }
            UpdateSubcommand::Required(args) => {
                commands::update::run_required(args, config, overrides).await
            }
        }
    }
}

/// Receipt wait shared by every command that broadcasts.
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Skip creating a keystore account.
    #[arg(long)]
    pub no_account: bool,
}

#[derive(Args, Debug)]
pub struct AccountNewArgs {
    /// Number of accounts to create.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct AccountListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AccountBalanceArgs {
    /// Defaults to every keystore account.
    pub addresses: Vec<String>,

    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AccountConvertArgs {
    #[arg(required = true)]
    pub addresses: Vec<String>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Wallet transaction id.
    pub id: Option<String>,

    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    /// Also show the wallet's balance of this token.
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TxSubmitArgs {
    pub amount: String,

    #[arg(long)]
    pub to: String,

    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    /// Message attached to the transfer.
    #[arg(long)]
    pub data: Option<String>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct TxIdArgs {
    pub id: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct TxListArgs {
    #[arg(long)]
    pub pending: bool,

    #[arg(long)]
    pub executed: bool,

    #[arg(long)]
    pub from_index: Option<u64>,

    /// Exclusive.
    #[arg(long)]
    pub to_index: Option<u64>,

    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct OwnerListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct OwnerCheckArgs {
    pub address: String,
}

#[derive(Args, Debug)]
pub struct OwnerChangeArgs {
    pub address: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct OwnerReplaceArgs {
    pub old: String,

    pub new: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct UpdateDailyLimitArgs {
    pub amount: String,

    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct UpdateRequiredArgs {
    pub required: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Start from this transaction file.
    #[arg(long = "in")]
    pub input: Option<PathBuf>,

    #[arg(long, default_value = "tx.json")]
    pub out: PathBuf,

    /// Do not contact the node; ask for nonce, gas and chain id instead.
    #[arg(long)]
    pub offline: bool,

    /// Use the input file as is.
    #[arg(long, requires = "input")]
    pub no_guide: bool,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    pub file: PathBuf,

    /// Defaults to `<file>.sign`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    pub file: PathBuf,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[arg(long)]
    pub from_block: Option<u64>,

    #[arg(long)]
    pub poll_ms: Option<u64>,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long)]
    pub json: bool,
}
