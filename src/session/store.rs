//! Shared session store
//!
//! Holds the current `SessionState` snapshot together with the live network
//! client. Mutations swap the whole snapshot under a write lock, persist the
//! durable part and then notify subscribers.

use crate::config::{NetworkClient, SessionConfig};
use crate::session::persistence::{load_state, save_state, StorageAdapter};
use crate::session::state::{NetworkId, SessionState, WalletAccount, WalletId, WalletState};
use std::sync::{Arc, Mutex, RwLock, Weak};

/// Callback invoked after every committed state replacement
pub type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Clone)]
struct Snapshot {
    state: Arc<SessionState>,
    client: Arc<NetworkClient>,
}

/// Handle returned by [`SessionStore::subscribe`]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Stop receiving updates
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

/// Process-local session store
pub struct SessionStore {
    current: RwLock<Snapshot>,
    listeners: Arc<Mutex<Listeners>>,
    storage: Arc<dyn StorageAdapter>,
    storage_key: String,
}

impl SessionStore {
    /// Open the store, restoring any valid persisted session
    pub fn open(config: &SessionConfig, storage: Arc<dyn StorageAdapter>) -> Self {
        let state = load_state(storage.as_ref(), &config.storage_key, config.default_network);
        let client = config.client_for(state.active_network);
        Self::with_state(state, client, storage, &config.storage_key)
    }

    /// Store seeded with an explicit state (nothing is read from storage)
    pub fn with_state(
        state: SessionState,
        client: NetworkClient,
        storage: Arc<dyn StorageAdapter>,
        storage_key: &str,
    ) -> Self {
        Self {
            current: RwLock::new(Snapshot {
                state: Arc::new(state),
                client: Arc::new(client),
            }),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            storage,
            storage_key: storage_key.to_string(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> Arc<SessionState> {
        self.snapshot().state
    }

    /// Client handle for the active network
    pub fn client(&self) -> Arc<NetworkClient> {
        self.snapshot().client
    }

    /// Register a listener for committed state replacements
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let mut listeners = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Apply a state transition atomically
    ///
    /// Unchanged results are not committed. Returns whether a commit happened.
    fn commit<F>(&self, client: Option<NetworkClient>, transition: F) -> bool
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        let next = {
            let mut guard = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };

            let next = transition(guard.state.as_ref());
            let client_changed = client
                .as_ref()
                .map(|c| c != guard.client.as_ref())
                .unwrap_or(false);
            if next == *guard.state && !client_changed {
                return false;
            }

            let next = Arc::new(next);
            guard.state = Arc::clone(&next);
            if let Some(client) = client {
                guard.client = Arc::new(client);
            }

            // Written under the lock so writes land in commit order
            if let Err(e) = save_state(self.storage.as_ref(), &self.storage_key, &next) {
                log::warn!("Failed to persist session state: {}", e);
            }
            next
        };

        self.notify(&next);
        true
    }

    fn notify(&self, state: &SessionState) {
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(guard) => guard.entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .entries
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect(),
        };
        for listener in listeners {
            listener(state);
        }
    }

    pub fn add_wallet(&self, wallet_id: WalletId, wallet: &WalletState) {
        if self.commit(None, |s| s.add_wallet(wallet_id, wallet)) {
            log::info!(
                "Connected {} with {} account(s)",
                wallet_id,
                wallet.accounts.len()
            );
        }
    }

    pub fn remove_wallet(&self, wallet_id: WalletId) {
        if self.commit(None, |s| s.remove_wallet(wallet_id)) {
            log::info!("Removed {} from session", wallet_id);
        }
    }

    pub fn set_active_wallet(&self, wallet_id: Option<WalletId>) {
        self.commit(None, |s| s.set_active_wallet(wallet_id));
    }

    pub fn set_active_account(&self, wallet_id: WalletId, address: &str) {
        self.commit(None, |s| s.set_active_account(wallet_id, address));
    }

    pub fn set_accounts(&self, wallet_id: WalletId, accounts: &[WalletAccount]) {
        self.commit(None, |s| s.set_accounts(wallet_id, accounts));
    }

    /// Switch network and client handle together
    pub fn set_active_network(&self, network_id: NetworkId, client: NetworkClient) {
        self.commit(Some(client), |s| s.set_active_network(network_id));
    }
}
