//! Wallet Session: multi-wallet session store and transaction co-signing
//!
//! This crate provides:
//! - A shared session store for several concurrently connected wallets, with
//!   an active wallet, per-wallet active account and active network
//! - Durable persistence that validates restored state and falls back to an
//!   empty session on anything unexpected
//! - A co-signing engine that works out which slots of a transaction group
//!   the active wallet may sign, asks the wallet, and merges the result back
//! - A provider interface wallet backends implement, plus a mock backend
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wallet_session::config::SessionConfig;
//! use wallet_session::provider::MockProvider;
//! use wallet_session::session::{MemoryStorage, SessionStore, WalletAccount, WalletId};
//! use wallet_session::signing::SignOptions;
//! use wallet_session::txn::Transaction;
//! use wallet_session::wallet::WalletManager;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = SessionConfig::default();
//! let store = Arc::new(SessionStore::open(&config, Arc::new(MemoryStorage::new())));
//!
//! let mut manager = WalletManager::new(store, config);
//! let accounts = vec![WalletAccount::new("Main", "ADDR1")];
//! manager.register(Arc::new(MockProvider::new(WalletId::Pera, accounts)));
//! manager.connect(WalletId::Pera).await.unwrap();
//!
//! let txn = Transaction::payment("ADDR1", "ADDR2", 1_000);
//! let signed = manager
//!     .sign_transactions(txn, SignOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(signed.len(), 1);
//! # });
//! ```

pub mod cli;
pub mod config;
pub mod provider;
pub mod session;
pub mod signing;
pub mod txn;
pub mod wallet;

// Re-export commonly used types
pub use config::{NetworkClient, NodeEndpoint, SessionConfig};
pub use provider::{MockProvider, ProviderError, ResponseLayout, WalletProvider};
pub use session::{
    FileStorage, MemoryStorage, NetworkId, SessionState, SessionStore, StorageAdapter,
    WalletAccount, WalletId, WalletState,
};
pub use signing::{sign_transactions, SignError, SignOptions, TransactionGroup};
pub use txn::{Transaction, TxnError};
pub use wallet::{WalletError, WalletManager};
