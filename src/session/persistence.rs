//! Session persistence layer
//!
//! Provides the key/value storage adapters and the save/load round trip for
//! the durable session state.

use crate::session::state::{NetworkId, SessionState};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous key/value storage of opaque strings
pub trait StorageAdapter: Send + Sync {
    /// Read a value; a missing key or missing backing store yields `None`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-process storage, used by tests and embedders without a disk
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one item
    pub fn with_item(key: &str, value: &str) -> Self {
        let storage = Self::new();
        if let Ok(mut items) = storage.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
        storage
    }
}

impl StorageAdapter for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// File Storage
// =============================================================================

/// One file per key under a data directory
///
/// The directory is created lazily on the first write, so a missing directory
/// simply reads as empty.
#[derive(Debug, Clone)]
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Path of the file backing a key
    ///
    /// The key is hex-encoded so distinct keys never share a file.
    fn item_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", hex::encode(key)))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl StorageAdapter for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let path = self.item_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                log::warn!("Failed to read {:?}: {}", path, e);
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.item_path(key);

        // Write to temporary file first
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

// =============================================================================
// Save / Load
// =============================================================================

/// Serialize the durable state and write it
pub fn save_state(
    storage: &dyn StorageAdapter,
    key: &str,
    state: &SessionState,
) -> Result<(), StorageError> {
    let json = state.to_json()?;
    storage.set_item(key, &json)
}

/// Load and validate the persisted state
///
/// Never fails: anything missing, unparsable or invalid yields the default
/// empty state on `default_network`.
pub fn load_state(
    storage: &dyn StorageAdapter,
    key: &str,
    default_network: NetworkId,
) -> SessionState {
    let Some(raw) = storage.get_item(key) else {
        log::debug!("No persisted session under {}", key);
        return SessionState::new(default_network);
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Discarding unparsable persisted session: {}", raw);
            log::error!("Could not parse persisted session: {}", e);
            return SessionState::new(default_network);
        }
    };

    match SessionState::validate(value.clone()) {
        Ok(state) => {
            log::info!(
                "Restored session with {} wallet(s) on {}",
                state.wallets.len(),
                state.active_network
            );
            state
        }
        Err(e) => {
            log::warn!("Discarding invalid persisted session: {}", value);
            log::error!("Could not load persisted session: {}", e);
            SessionState::new(default_network)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::{WalletAccount, WalletId, WalletState};

    const KEY: &str = "wallet-session:v1";

    fn sample_state() -> SessionState {
        SessionState::new(NetworkId::Mainnet).add_wallet(
            WalletId::Lute,
            &WalletState::from_accounts(vec![WalletAccount::new("Main", "LUTE1")]),
        )
    }

    #[test]
    fn test_save_load_memory() {
        let storage = MemoryStorage::new();
        let state = sample_state();
        save_state(&storage, KEY, &state).unwrap();
        assert_eq!(load_state(&storage, KEY, NetworkId::Testnet), state);
    }

    #[test]
    fn test_missing_item_yields_default() {
        let storage = MemoryStorage::new();
        let state = load_state(&storage, KEY, NetworkId::Betanet);
        assert_eq!(state, SessionState::new(NetworkId::Betanet));
    }

    #[test]
    fn test_garbage_yields_default() {
        let storage = MemoryStorage::with_item(KEY, "{not json");
        assert_eq!(
            load_state(&storage, KEY, NetworkId::Testnet),
            SessionState::default()
        );
    }

    #[test]
    fn test_unknown_wallet_rejected_wholesale() {
        let raw = r#"{
            "wallets": {
                "pera": {"accounts": [{"name": "a", "address": "A"}], "activeAccount": null},
                "phantom": {"accounts": [], "activeAccount": null}
            },
            "activeWallet": "pera",
            "activeNetwork": "mainnet"
        }"#;
        let storage = MemoryStorage::with_item(KEY, raw);
        let state = load_state(&storage, KEY, NetworkId::Testnet);
        assert!(state.wallets.is_empty());
        assert_eq!(state.active_wallet, None);
        assert_eq!(state.active_network, NetworkId::Testnet);
    }

    #[test]
    fn test_save_load_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(&temp_dir.path().join("nested"));
        assert!(storage.get_item(KEY).is_none());

        let state = sample_state();
        save_state(&storage, KEY, &state).unwrap();
        assert!(storage.data_dir().exists());
        assert_eq!(load_state(&storage, KEY, NetworkId::Testnet), state);
    }

    #[test]
    fn test_file_keys_stay_distinct() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        storage.set_item("a/b", "slash").unwrap();
        storage.set_item("a_b", "underscore").unwrap();

        assert_eq!(storage.get_item("a/b").as_deref(), Some("slash"));
        assert_eq!(storage.get_item("a_b").as_deref(), Some("underscore"));
        assert!(temp_dir.path().join("612f62.json").exists());
        assert!(temp_dir.path().join("615f62.json").exists());
    }
}
