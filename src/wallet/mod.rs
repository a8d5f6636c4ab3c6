//! Wallet lifecycle management

pub mod manager;

pub use manager::{WalletError, WalletManager};
