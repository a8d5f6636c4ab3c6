//! walletctl
//!
//! A command-line interface for inspecting and editing a persisted wallet
//! session and for planning signing batches offline.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wallet_session::cli::{self, AppState};
use wallet_session::config::SessionConfig;
use wallet_session::session::{NetworkId, WalletAccount, WalletId};

#[derive(Parser)]
#[command(name = "walletctl")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Multi-wallet session store and co-signing planner", long_about = None)]
struct Cli {
    /// Data directory for session storage
    #[arg(short, long, default_value = ".wallet_session")]
    data_dir: PathBuf,

    /// Network used when no session is stored yet
    #[arg(short, long)]
    network: Option<NetworkId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session operations
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },

    /// Wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },

    /// Switch the active network
    Network {
        /// Network id (mainnet, testnet, betanet, fnet, localnet)
        network: NetworkId,
    },

    /// Show what the active wallet would be asked to sign
    Plan {
        /// JSON file holding a transaction group
        #[arg(short, long)]
        file: PathBuf,

        /// Only consider these slot indexes
        #[arg(short, long, value_delimiter = ',')]
        indexes: Option<Vec<usize>>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Print the stored session
    Show {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every wallet
    Reset,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Record a connected wallet
    Add {
        wallet: WalletId,

        /// Account as name=address (repeatable)
        #[arg(short, long = "account", value_parser = cli::parse_account, required = true)]
        accounts: Vec<WalletAccount>,
    },

    /// Forget a wallet
    Remove { wallet: WalletId },

    /// Select the active wallet
    Activate {
        #[arg(required_unless_present = "none")]
        wallet: Option<WalletId>,

        /// Clear the active wallet
        #[arg(long, conflicts_with = "wallet")]
        none: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Select a wallet's active account
    Activate { wallet: WalletId, address: String },

    /// Replace a wallet's accounts
    Set {
        wallet: WalletId,

        /// Account as name=address (repeatable)
        #[arg(short, long = "account", value_parser = cli::parse_account)]
        accounts: Vec<WalletAccount>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = SessionConfig {
        data_dir: cli.data_dir.clone(),
        ..Default::default()
    };
    if let Some(network) = cli.network {
        config.default_network = network;
    }
    let state = AppState::with_config(config)?;

    match cli.command {
        Commands::Session { action } => match action {
            SessionCommands::Show { json } => cli::cmd_session_show(&state, json)?,
            SessionCommands::Reset => cli::cmd_session_reset(&state)?,
        },

        Commands::Wallet { action } => match action {
            WalletCommands::Add { wallet, accounts } => {
                cli::cmd_wallet_add(&state, wallet, accounts)?;
            }
            WalletCommands::Remove { wallet } => cli::cmd_wallet_remove(&state, wallet)?,
            WalletCommands::Activate { wallet, none } => {
                let target = if none { None } else { wallet };
                cli::cmd_wallet_activate(&state, target)?;
            }
        },

        Commands::Account { action } => match action {
            AccountCommands::Activate { wallet, address } => {
                cli::cmd_account_activate(&state, wallet, &address)?;
            }
            AccountCommands::Set { wallet, accounts } => {
                cli::cmd_accounts_set(&state, wallet, accounts)?;
            }
        },

        Commands::Network { network } => cli::cmd_network_set(&state, network)?,

        Commands::Plan { file, indexes } => {
            cli::cmd_plan(&state, &file, indexes.as_deref())?;
        }
    }

    Ok(())
}
