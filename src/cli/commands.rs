//! CLI commands for the session store
//!
//! Implements all command handlers for the `walletctl` binary.

use crate::config::SessionConfig;
use crate::session::{
    FileStorage, NetworkId, SessionState, SessionStore, WalletAccount, WalletId, WalletState,
};
use crate::signing::{plan, SigningPlan, TransactionGroup};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub config: SessionConfig,
    pub store: Arc<SessionStore>,
}

impl AppState {
    /// Open the session persisted under `data_dir`
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let config = SessionConfig {
            data_dir,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: SessionConfig) -> CliResult<Self> {
        let storage = Arc::new(FileStorage::new(&config.data_dir));
        let store = Arc::new(SessionStore::open(&config, storage));
        Ok(Self { config, store })
    }
}

/// Parse a `name=address` account argument
pub fn parse_account(arg: &str) -> Result<WalletAccount, String> {
    match arg.split_once('=') {
        Some((name, address)) if !address.is_empty() => Ok(WalletAccount::new(name, address)),
        Some(_) => Err(format!("missing address in '{}'", arg)),
        None => Ok(WalletAccount::new(arg, arg)),
    }
}

fn print_state(state: &SessionState) {
    println!("🌐 Network: {}", state.active_network);
    match state.active_wallet {
        Some(id) => println!("👛 Active wallet: {}", id),
        None => println!("👛 Active wallet: -"),
    }

    if state.wallets.is_empty() {
        println!("📭 No wallets connected. Add one with: walletctl wallet add");
        return;
    }

    println!("📋 Wallets:");
    for (id, wallet) in &state.wallets {
        println!("   {} ({} account(s))", id, wallet.accounts.len());
        for account in &wallet.accounts {
            let marker = match &wallet.active_account {
                Some(active) if active.address == account.address => "*",
                _ => " ",
            };
            println!("   {} {} - {}", marker, account.address, account.name);
        }
    }
}

/// Show the persisted session
pub fn cmd_session_show(state: &AppState, json: bool) -> CliResult<()> {
    let session = state.store.state();
    if json {
        println!("{}", session.to_json()?);
    } else {
        print_state(&session);
    }
    Ok(())
}

/// Forget every wallet and go back to the default network
pub fn cmd_session_reset(state: &AppState) -> CliResult<()> {
    let wallets: Vec<WalletId> = state.store.state().wallets.keys().copied().collect();
    for id in &wallets {
        state.store.remove_wallet(*id);
    }

    let network = state.config.default_network;
    state
        .store
        .set_active_network(network, state.config.client_for(network));

    println!("🧹 Session reset ({} wallet(s) removed)", wallets.len());
    Ok(())
}

/// Record a connected wallet and make it active
pub fn cmd_wallet_add(
    state: &AppState,
    wallet_id: WalletId,
    accounts: Vec<WalletAccount>,
) -> CliResult<()> {
    if accounts.is_empty() {
        return Err(format!("[{}] No accounts found", wallet_id).into());
    }

    let wallet = WalletState::from_accounts(accounts);
    state.store.add_wallet(wallet_id, &wallet);

    println!("✅ {} added with {} account(s)", wallet_id, wallet.accounts.len());
    Ok(())
}

pub fn cmd_wallet_remove(state: &AppState, wallet_id: WalletId) -> CliResult<()> {
    if !state.store.state().wallets.contains_key(&wallet_id) {
        println!("⚠️  {} is not connected", wallet_id);
        return Ok(());
    }
    state.store.remove_wallet(wallet_id);
    println!("🗑️  {} removed", wallet_id);
    Ok(())
}

pub fn cmd_wallet_activate(state: &AppState, wallet_id: Option<WalletId>) -> CliResult<()> {
    state.store.set_active_wallet(wallet_id);
    match wallet_id {
        Some(id) => println!("👛 Active wallet: {}", id),
        None => println!("👛 Active wallet cleared"),
    }
    Ok(())
}

pub fn cmd_account_activate(state: &AppState, wallet_id: WalletId, address: &str) -> CliResult<()> {
    let before = state.store.state();
    state.store.set_active_account(wallet_id, address);

    if state.store.state() == before {
        println!("⚠️  No change: {} has no account {}", wallet_id, address);
    } else {
        println!("✅ {} active account: {}", wallet_id, address);
    }
    Ok(())
}

pub fn cmd_accounts_set(
    state: &AppState,
    wallet_id: WalletId,
    accounts: Vec<WalletAccount>,
) -> CliResult<()> {
    if !state.store.state().wallets.contains_key(&wallet_id) {
        return Err(format!("{} is not connected", wallet_id).into());
    }
    state.store.set_accounts(wallet_id, &accounts);
    println!("✅ {} now has {} account(s)", wallet_id, accounts.len());
    Ok(())
}

pub fn cmd_network_set(state: &AppState, network: NetworkId) -> CliResult<()> {
    let client = state.config.client_for(network);
    println!("🌐 Switching to {} ({})", network, client.endpoint.url);
    state.store.set_active_network(network, client);
    Ok(())
}

/// Plan a signing batch for the active wallet without contacting it
pub fn cmd_plan(state: &AppState, file: &Path, indexes: Option<&[usize]>) -> CliResult<SigningPlan> {
    let raw = fs::read_to_string(file)?;
    let value: Value = serde_json::from_str(&raw)?;
    let group = TransactionGroup::from_json(&value)?;

    let session = state.store.state();
    let connected = match session.active_wallet {
        Some(id) => session.connected_addresses(id),
        None => {
            println!("⚠️  No active wallet, nothing will be signed");
            Default::default()
        }
    };

    let signing_plan = plan(group, &connected, indexes)?;

    println!(
        "📝 {} of {} transaction(s) to sign",
        signing_plan.eligible_count(),
        signing_plan.slots.len()
    );
    for (slot, decision) in signing_plan.slots.iter().zip(&signing_plan.decisions) {
        let status = if decision.should_sign {
            "sign"
        } else if slot.is_pre_signed {
            "pre-signed"
        } else {
            "skip"
        };
        println!("   [{}] {} {}", slot.index, status, slot.signer);
    }
    println!("{}", serde_json::to_string_pretty(&signing_plan.requests)?);

    Ok(signing_plan)
}
