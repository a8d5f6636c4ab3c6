//! Wallet manager
//!
//! Owns the provider registry and drives the session store through wallet
//! lifecycles: connect, disconnect, resume after restart, and signing with
//! whichever wallet is active.

use crate::config::SessionConfig;
use crate::provider::{ProviderError, WalletProvider};
use crate::session::{NetworkId, SessionStore, WalletId, WalletState};
use crate::signing::{self, SignError, SignOptions, TransactionGroup};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Wallet manager errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("No provider registered for {0}")]
    UnknownProvider(WalletId),
    #[error("[{0}] No accounts found")]
    NoAccounts(WalletId),
    #[error("[{wallet}] Connect failed: {source}")]
    Connect {
        wallet: WalletId,
        source: ProviderError,
    },
    #[error("No active wallet")]
    NoActiveWallet,
    #[error("Signing failed: {0}")]
    Sign(#[from] SignError),
}

/// Coordinates wallet providers with the shared session store
pub struct WalletManager {
    store: Arc<SessionStore>,
    providers: BTreeMap<WalletId, Arc<dyn WalletProvider>>,
    config: SessionConfig,
}

impl WalletManager {
    pub fn new(store: Arc<SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            providers: BTreeMap::new(),
            config,
        }
    }

    /// Register a provider, replacing any previous one for the same wallet
    pub fn register(&mut self, provider: Arc<dyn WalletProvider>) {
        let id = provider.id();
        if self.providers.insert(id, provider).is_some() {
            log::warn!("Replaced provider for {}", id);
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn provider(&self, wallet_id: WalletId) -> Result<Arc<dyn WalletProvider>, WalletError> {
        self.providers
            .get(&wallet_id)
            .cloned()
            .ok_or(WalletError::UnknownProvider(wallet_id))
    }

    /// Registered wallet ids
    pub fn wallets(&self) -> Vec<WalletId> {
        self.providers.keys().copied().collect()
    }

    /// Connect a wallet and make it active
    ///
    /// The store is left untouched when the provider fails or returns no
    /// accounts.
    pub async fn connect(&self, wallet_id: WalletId) -> Result<WalletState, WalletError> {
        let provider = self.provider(wallet_id)?;

        let accounts = provider
            .connect()
            .await
            .map_err(|source| WalletError::Connect {
                wallet: wallet_id,
                source,
            })?;

        if accounts.is_empty() {
            log::error!("[{}] Connect returned no accounts", wallet_id);
            return Err(WalletError::NoAccounts(wallet_id));
        }

        let wallet = WalletState::from_accounts(accounts);
        self.store.add_wallet(wallet_id, &wallet);
        Ok(wallet)
    }

    /// Disconnect a wallet and drop it from the session
    pub async fn disconnect(&self, wallet_id: WalletId) -> Result<(), WalletError> {
        let provider = self.provider(wallet_id)?;

        if let Err(e) = provider.disconnect().await {
            log::warn!("[{}] Provider disconnect failed: {}", wallet_id, e);
        }
        self.store.remove_wallet(wallet_id);
        Ok(())
    }

    /// Reconcile persisted wallets with their backends after a restart
    pub async fn resume_sessions(&self) {
        let stored: Vec<WalletId> = self.store.state().wallets.keys().copied().collect();

        for wallet_id in stored {
            let Some(provider) = self.providers.get(&wallet_id) else {
                log::debug!("[{}] No provider registered, skipping resume", wallet_id);
                continue;
            };

            match provider.resume_session().await {
                Ok(Some(accounts)) => {
                    log::info!("[{}] Session resumed", wallet_id);
                    self.store.set_accounts(wallet_id, &accounts);
                }
                Ok(None) => {
                    log::info!("[{}] Session no longer available", wallet_id);
                    self.store.remove_wallet(wallet_id);
                }
                Err(e) => log::error!("[{}] Could not resume session: {}", wallet_id, e),
            }
        }
    }

    pub fn set_active_wallet(&self, wallet_id: Option<WalletId>) {
        self.store.set_active_wallet(wallet_id);
    }

    pub fn set_active_account(&self, wallet_id: WalletId, address: &str) {
        self.store.set_active_account(wallet_id, address);
    }

    /// Switch network, building the client handle from config
    pub fn set_active_network(&self, network_id: NetworkId) {
        let client = self.config.client_for(network_id);
        self.store.set_active_network(network_id, client);
    }

    /// Sign a group with the active wallet
    ///
    /// Without an explicit timeout in `options` the configured one applies.
    pub async fn sign_transactions(
        &self,
        group: impl Into<TransactionGroup>,
        mut options: SignOptions,
    ) -> Result<Vec<Option<Vec<u8>>>, WalletError> {
        let wallet_id = self
            .store
            .state()
            .active_wallet
            .ok_or(WalletError::NoActiveWallet)?;
        let provider = self.provider(wallet_id)?;

        if options.timeout.is_none() {
            options.timeout = self.config.sign_timeout;
        }

        let signed =
            signing::sign_transactions(&self.store, provider.as_ref(), group, options).await?;
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, ERR_TIMEOUT, ERR_UNAUTHORIZED};
    use crate::session::{MemoryStorage, WalletAccount};
    use crate::txn::Transaction;
    use std::time::Duration;

    fn accounts(addrs: &[&str]) -> Vec<WalletAccount> {
        addrs
            .iter()
            .map(|a| WalletAccount::new(&format!("{} account", a), a))
            .collect()
    }

    fn manager() -> WalletManager {
        let config = SessionConfig::default();
        let store = Arc::new(SessionStore::open(&config, Arc::new(MemoryStorage::new())));
        WalletManager::new(store, config)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let mut manager = manager();
        let provider = Arc::new(MockProvider::new(WalletId::Pera, accounts(&["ADDR1", "ADDR2"])));
        manager.register(provider.clone());

        let wallet = manager.connect(WalletId::Pera).await.unwrap();
        assert_eq!(wallet.active_account.unwrap().address, "ADDR1");

        let state = manager.store().state();
        assert_eq!(state.active_wallet, Some(WalletId::Pera));
        assert_eq!(state.wallets[&WalletId::Pera].accounts.len(), 2);

        manager.disconnect(WalletId::Pera).await.unwrap();
        assert!(manager.store().state().wallets.is_empty());
        assert_eq!(provider.disconnect_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_with_no_accounts() {
        let mut manager = manager();
        manager.register(Arc::new(MockProvider::new(WalletId::Lute, vec![])));

        let err = manager.connect(WalletId::Lute).await.unwrap_err();
        assert!(matches!(err, WalletError::NoAccounts(WalletId::Lute)));
        assert_eq!(err.to_string(), "[lute] No accounts found");
        assert!(manager.store().state().wallets.is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_store() {
        let mut manager = manager();
        manager.register(Arc::new(
            MockProvider::new(WalletId::Defly, accounts(&["ADDR1"]))
                .failing_connect(ProviderError::rejected()),
        ));

        let err = manager.connect(WalletId::Defly).await.unwrap_err();
        assert!(matches!(err, WalletError::Connect { .. }));
        assert_eq!(manager.store().state().active_wallet, None);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let manager = manager();
        assert!(matches!(
            manager.connect(WalletId::Kmd).await,
            Err(WalletError::UnknownProvider(WalletId::Kmd))
        ));
    }

    #[tokio::test]
    async fn test_switching_wallets_keeps_both_connected() {
        let mut manager = manager();
        manager.register(Arc::new(MockProvider::new(WalletId::Pera, accounts(&["P1"]))));
        manager.register(Arc::new(MockProvider::new(WalletId::Defly, accounts(&["D1"]))));

        manager.connect(WalletId::Pera).await.unwrap();
        manager.connect(WalletId::Defly).await.unwrap();
        assert_eq!(manager.store().state().active_wallet, Some(WalletId::Defly));

        manager.set_active_wallet(Some(WalletId::Pera));
        let state = manager.store().state();
        assert_eq!(state.active_wallet, Some(WalletId::Pera));
        assert_eq!(state.wallets.len(), 2);

        manager.disconnect(WalletId::Defly).await.unwrap();
        assert_eq!(manager.store().state().active_wallet, Some(WalletId::Pera));
    }

    #[tokio::test]
    async fn test_resume_sessions() {
        let storage = Arc::new(MemoryStorage::new());
        let config = SessionConfig::default();

        {
            let store = Arc::new(SessionStore::open(&config, storage.clone()));
            let mut first = WalletManager::new(store, config.clone());
            first.register(Arc::new(MockProvider::new(WalletId::Pera, accounts(&["P1"]))));
            first.register(Arc::new(MockProvider::new(WalletId::Defly, accounts(&["D1"]))));
            first.register(Arc::new(MockProvider::new(WalletId::Kmd, accounts(&["K1"]))));
            first.connect(WalletId::Pera).await.unwrap();
            first.connect(WalletId::Defly).await.unwrap();
            first.connect(WalletId::Kmd).await.unwrap();
        }

        // After a restart: Pera has a new account, Defly lost its session,
        // Kmd cannot be reached
        let store = Arc::new(SessionStore::open(&config, storage));
        let mut manager = WalletManager::new(store, config);
        manager.register(Arc::new(MockProvider::new(
            WalletId::Pera,
            accounts(&["P1", "P2"]),
        )));
        manager.register(Arc::new(
            MockProvider::new(WalletId::Defly, vec![]).without_session(),
        ));
        manager.register(Arc::new(
            MockProvider::new(WalletId::Kmd, vec![])
                .failing_resume(ProviderError::new(ERR_UNAUTHORIZED, "locked")),
        ));
        manager.resume_sessions().await;

        let state = manager.store().state();
        assert_eq!(state.wallets[&WalletId::Pera].accounts.len(), 2);
        assert!(!state.wallets.contains_key(&WalletId::Defly));
        assert_eq!(state.wallets[&WalletId::Kmd].accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_routes_to_active_wallet() {
        let mut manager = manager();
        let pera = Arc::new(MockProvider::new(WalletId::Pera, accounts(&["P1"])));
        let defly = Arc::new(MockProvider::new(WalletId::Defly, accounts(&["D1"])));
        manager.register(pera.clone());
        manager.register(defly.clone());
        manager.connect(WalletId::Pera).await.unwrap();
        manager.connect(WalletId::Defly).await.unwrap();
        manager.set_active_wallet(Some(WalletId::Pera));

        let txn = Transaction::payment("P1", "X", 5);
        let result = manager
            .sign_transactions(txn.clone(), SignOptions::default())
            .await
            .unwrap();

        assert_eq!(
            result,
            vec![Some(MockProvider::sign_bytes(&txn.encode().unwrap()).unwrap())]
        );
        assert_eq!(pera.recorded_requests().len(), 1);
        assert!(defly.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_without_active_wallet() {
        let manager = manager();
        let err = manager
            .sign_transactions(Transaction::payment("A", "B", 1), SignOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NoActiveWallet));
    }

    #[tokio::test]
    async fn test_configured_timeout_applies() {
        let config = SessionConfig {
            sign_timeout: Some(Duration::from_millis(20)),
            ..SessionConfig::default()
        };
        let store = Arc::new(SessionStore::open(&config, Arc::new(MemoryStorage::new())));
        let mut manager = WalletManager::new(store, config);
        manager.register(Arc::new(
            MockProvider::new(WalletId::Magic, accounts(&["M1"]))
                .with_delay(Duration::from_secs(30)),
        ));
        manager.connect(WalletId::Magic).await.unwrap();

        let err = manager
            .sign_transactions(Transaction::payment("M1", "X", 1), SignOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Sign(SignError::Provider(ref e)) if e.code == ERR_TIMEOUT
        ));
    }

    #[tokio::test]
    async fn test_set_active_network() {
        let manager = manager();
        manager.set_active_network(NetworkId::Betanet);
        assert_eq!(manager.store().state().active_network, NetworkId::Betanet);
        assert_eq!(
            manager.store().client().endpoint.url,
            "https://betanet-api.algonode.cloud"
        );
    }
}
