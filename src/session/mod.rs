//! Wallet session store
//!
//! This module provides:
//! - The canonical session state and its pure mutation functions
//! - The shared store that swaps snapshots and notifies subscribers
//! - Storage adapters and the validated persistence round trip

pub mod persistence;
pub mod state;
pub mod store;

pub use persistence::{
    load_state, save_state, FileStorage, MemoryStorage, StorageAdapter, StorageError,
};
pub use state::{NetworkId, SessionError, SessionState, WalletAccount, WalletId, WalletState};
pub use store::{Listener, SessionStore, Subscription};
