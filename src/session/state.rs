//! Canonical session state
//!
//! `SessionState` is an immutable value. Every mutation below is a pure
//! function of the previous state that returns the next one; the store swaps
//! whole snapshots and never edits one in place.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Reasons a persisted session is rejected
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid JSON: {0}")]
    Parse(serde_json::Error),
    #[error("Invalid session shape: {0}")]
    Shape(serde_json::Error),
    #[error("Active account {address} of wallet {wallet} is not among its accounts")]
    UnknownActiveAccount { wallet: WalletId, address: String },
    #[error("Duplicate account address {address} in wallet {wallet}")]
    DuplicateAddress { wallet: WalletId, address: String },
}

// =============================================================================
// Identifiers
// =============================================================================

/// Known wallet backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletId {
    Biatec,
    Defly,
    DeflyWeb,
    Exodus,
    Kibisis,
    Kmd,
    Lute,
    Magic,
    Mnemonic,
    Pera,
    #[serde(rename = "walletconnect")]
    WalletConnect,
    W3Wallet,
    Custom,
}

impl WalletId {
    pub const ALL: [WalletId; 13] = [
        WalletId::Biatec,
        WalletId::Defly,
        WalletId::DeflyWeb,
        WalletId::Exodus,
        WalletId::Kibisis,
        WalletId::Kmd,
        WalletId::Lute,
        WalletId::Magic,
        WalletId::Mnemonic,
        WalletId::Pera,
        WalletId::WalletConnect,
        WalletId::W3Wallet,
        WalletId::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletId::Biatec => "biatec",
            WalletId::Defly => "defly",
            WalletId::DeflyWeb => "defly-web",
            WalletId::Exodus => "exodus",
            WalletId::Kibisis => "kibisis",
            WalletId::Kmd => "kmd",
            WalletId::Lute => "lute",
            WalletId::Magic => "magic",
            WalletId::Mnemonic => "mnemonic",
            WalletId::Pera => "pera",
            WalletId::WalletConnect => "walletconnect",
            WalletId::W3Wallet => "w3-wallet",
            WalletId::Custom => "custom",
        }
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown wallet id: {}", s))
    }
}

/// Known networks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    #[default]
    Testnet,
    Betanet,
    Fnet,
    Localnet,
}

impl NetworkId {
    pub const ALL: [NetworkId; 5] = [
        NetworkId::Mainnet,
        NetworkId::Testnet,
        NetworkId::Betanet,
        NetworkId::Fnet,
        NetworkId::Localnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => "mainnet",
            NetworkId::Testnet => "testnet",
            NetworkId::Betanet => "betanet",
            NetworkId::Fnet => "fnet",
            NetworkId::Localnet => "localnet",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown network id: {}", s))
    }
}

// =============================================================================
// Wallet State
// =============================================================================

/// A named address belonging to a connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletAccount {
    pub name: String,
    pub address: String,
}

impl WalletAccount {
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

/// Nullable field that must still be present in the input
fn required_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Accounts and active-account selection of one connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WalletState {
    pub accounts: Vec<WalletAccount>,
    #[serde(deserialize_with = "required_nullable")]
    pub active_account: Option<WalletAccount>,
}

impl WalletState {
    /// Wallet state with the first account active
    pub fn from_accounts(accounts: Vec<WalletAccount>) -> Self {
        Self {
            active_account: accounts.first().cloned(),
            accounts,
        }
        .normalized()
    }

    /// Copy with unique addresses (first occurrence wins) and an active
    /// account that is one of the remaining accounts
    pub fn normalized(&self) -> Self {
        let mut seen = HashSet::new();
        let accounts: Vec<WalletAccount> = self
            .accounts
            .iter()
            .filter(|a| seen.insert(a.address.as_str()))
            .cloned()
            .collect();

        let active_account = self.active_account.as_ref().and_then(|active| {
            accounts
                .iter()
                .find(|a| a.address == active.address)
                .or_else(|| accounts.first())
                .cloned()
        });

        Self {
            accounts,
            active_account,
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.accounts.iter().map(|a| a.address.as_str())
    }

    pub fn has_address(&self, address: &str) -> bool {
        self.accounts.iter().any(|a| a.address == address)
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Durable session state: connected wallets, selections, network
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionState {
    pub wallets: BTreeMap<WalletId, WalletState>,
    #[serde(deserialize_with = "required_nullable")]
    pub active_wallet: Option<WalletId>,
    pub active_network: NetworkId,
}

impl SessionState {
    /// Empty state on the given network
    pub fn new(active_network: NetworkId) -> Self {
        Self {
            wallets: BTreeMap::new(),
            active_wallet: None,
            active_network,
        }
    }

    /// Insert or overwrite a wallet and make it active
    pub fn add_wallet(&self, wallet_id: WalletId, wallet: &WalletState) -> Self {
        let normalized = wallet.normalized();
        if normalized.accounts.len() != wallet.accounts.len() {
            log::warn!("add_wallet: dropped duplicate addresses for {}", wallet_id);
        }
        let mut next = self.clone();
        next.wallets.insert(wallet_id, normalized);
        next.active_wallet = Some(wallet_id);
        next
    }

    /// Remove a wallet, clearing the active wallet only if it was this one
    pub fn remove_wallet(&self, wallet_id: WalletId) -> Self {
        if !self.wallets.contains_key(&wallet_id) {
            return self.clone();
        }

        let mut next = self.clone();
        next.wallets.remove(&wallet_id);
        if next.active_wallet == Some(wallet_id) {
            next.active_wallet = None;
        }
        next
    }

    pub fn set_active_wallet(&self, wallet_id: Option<WalletId>) -> Self {
        Self {
            active_wallet: wallet_id,
            ..self.clone()
        }
    }

    /// Select the active account of a wallet; unknown wallet or address is a no-op
    pub fn set_active_account(&self, wallet_id: WalletId, address: &str) -> Self {
        let Some(wallet) = self.wallets.get(&wallet_id) else {
            log::warn!("set_active_account: wallet {} is not connected", wallet_id);
            return self.clone();
        };

        let Some(account) = wallet.accounts.iter().find(|a| a.address == address) else {
            log::warn!(
                "set_active_account: address {} not found in wallet {}",
                address,
                wallet_id
            );
            return self.clone();
        };

        let mut next = self.clone();
        if let Some(entry) = next.wallets.get_mut(&wallet_id) {
            entry.active_account = Some(account.clone());
        }
        next
    }

    /// Replace a wallet's accounts, re-pointing the active account if it disappeared
    pub fn set_accounts(&self, wallet_id: WalletId, accounts: &[WalletAccount]) -> Self {
        let Some(wallet) = self.wallets.get(&wallet_id) else {
            log::warn!("set_accounts: wallet {} is not connected", wallet_id);
            return self.clone();
        };

        // Keep the active account if it survived, otherwise fall back to the first
        let next_wallet = WalletState {
            accounts: accounts.to_vec(),
            active_account: wallet
                .active_account
                .clone()
                .or_else(|| accounts.first().cloned()),
        }
        .normalized();
        if next_wallet.accounts.len() != accounts.len() {
            log::warn!("set_accounts: dropped duplicate addresses for {}", wallet_id);
        }

        let mut next = self.clone();
        next.wallets.insert(wallet_id, next_wallet);
        next
    }

    pub fn set_active_network(&self, network_id: NetworkId) -> Self {
        Self {
            active_network: network_id,
            ..self.clone()
        }
    }

    /// State of the active wallet, if any
    pub fn active_wallet_state(&self) -> Option<&WalletState> {
        self.active_wallet.and_then(|id| self.wallets.get(&id))
    }

    /// Addresses a wallet is currently authorized to sign for
    pub fn connected_addresses(&self, wallet_id: WalletId) -> HashSet<String> {
        self.wallets
            .get(&wallet_id)
            .map(|w| w.addresses().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Serialize the durable state
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse and validate a serialized state
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_str(json).map_err(SessionError::Parse)?;
        Self::validate(value)
    }

    /// Validate an already-parsed value against the exact persisted shape
    ///
    /// `activeWallet` only has to be a known id: `set_active_wallet` may
    /// commit a wallet that is not connected, and such a state must restore.
    pub fn validate(value: Value) -> Result<Self, SessionError> {
        let state: SessionState = serde_json::from_value(value).map_err(SessionError::Shape)?;

        for (wallet_id, wallet) in &state.wallets {
            let mut seen = HashSet::new();
            for account in &wallet.accounts {
                if !seen.insert(account.address.as_str()) {
                    return Err(SessionError::DuplicateAddress {
                        wallet: *wallet_id,
                        address: account.address.clone(),
                    });
                }
            }

            if let Some(active) = &wallet.active_account {
                if !wallet.has_address(&active.address) {
                    return Err(SessionError::UnknownActiveAccount {
                        wallet: *wallet_id,
                        address: active.address.clone(),
                    });
                }
            }
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn account(n: u8) -> WalletAccount {
        WalletAccount::new(&format!("Account {}", n), &format!("ADDR{}", n))
    }

    fn two_wallets() -> SessionState {
        SessionState::default()
            .add_wallet(
                WalletId::Pera,
                &WalletState::from_accounts(vec![account(1), account(2)]),
            )
            .add_wallet(WalletId::Defly, &WalletState::from_accounts(vec![account(3)]))
    }

    #[test]
    fn test_add_wallet_sets_active() {
        let state = two_wallets();
        assert_eq!(state.active_wallet, Some(WalletId::Defly));
        assert_eq!(state.wallets.len(), 2);
        assert_eq!(
            state.wallets[&WalletId::Pera].active_account,
            Some(account(1))
        );
    }

    #[test]
    fn test_add_wallet_copies_input() {
        let mut input = WalletState::from_accounts(vec![account(1)]);
        let state = SessionState::default().add_wallet(WalletId::Kmd, &input);
        input.accounts.push(account(2));
        assert_eq!(state.wallets[&WalletId::Kmd].accounts.len(), 1);
    }

    #[test]
    fn test_remove_non_active_wallet_keeps_active() {
        let state = two_wallets().remove_wallet(WalletId::Pera);
        assert_eq!(state.active_wallet, Some(WalletId::Defly));
        assert!(!state.wallets.contains_key(&WalletId::Pera));
    }

    #[test]
    fn test_remove_active_wallet_clears_active() {
        let state = two_wallets().remove_wallet(WalletId::Defly);
        assert_eq!(state.active_wallet, None);
        assert_eq!(state.wallets.len(), 1);
    }

    #[test]
    fn test_remove_absent_wallet_is_noop() {
        let state = two_wallets();
        assert_eq!(state.remove_wallet(WalletId::Lute), state);
    }

    #[test]
    fn test_set_active_account() {
        let state = two_wallets().set_active_account(WalletId::Pera, "ADDR2");
        let pera = &state.wallets[&WalletId::Pera];
        assert_eq!(pera.active_account, Some(account(2)));
        assert_eq!(pera.accounts, vec![account(1), account(2)]);
    }

    #[test]
    fn test_set_active_account_guards() {
        let state = two_wallets();
        assert_eq!(state.set_active_account(WalletId::Pera, "NOPE"), state);
        assert_eq!(state.set_active_account(WalletId::Exodus, "ADDR1"), state);
    }

    #[test]
    fn test_set_accounts_keeps_surviving_active() {
        let state = two_wallets()
            .set_active_account(WalletId::Pera, "ADDR2")
            .set_accounts(WalletId::Pera, &[account(4), account(2)]);
        assert_eq!(
            state.wallets[&WalletId::Pera].active_account,
            Some(account(2))
        );
    }

    #[test]
    fn test_set_accounts_falls_back() {
        let state = two_wallets().set_accounts(WalletId::Pera, &[account(5), account(6)]);
        assert_eq!(
            state.wallets[&WalletId::Pera].active_account,
            Some(account(5))
        );

        let emptied = state.set_accounts(WalletId::Pera, &[]);
        let pera = &emptied.wallets[&WalletId::Pera];
        assert!(pera.accounts.is_empty());
        assert_eq!(pera.active_account, None);
    }

    #[test]
    fn test_set_accounts_absent_wallet_is_noop() {
        let state = two_wallets();
        assert_eq!(state.set_accounts(WalletId::Magic, &[account(9)]), state);
    }

    #[test]
    fn test_connected_addresses() {
        let state = two_wallets();
        let addrs = state.connected_addresses(WalletId::Pera);
        assert!(addrs.contains("ADDR1") && addrs.contains("ADDR2"));
        assert!(state.connected_addresses(WalletId::Kibisis).is_empty());
    }

    #[test]
    fn test_persisted_shape() {
        let state = SessionState::new(NetworkId::Mainnet)
            .add_wallet(WalletId::WalletConnect, &WalletState::from_accounts(vec![account(1)]));
        let value: Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "wallets": {
                    "walletconnect": {
                        "accounts": [{"name": "Account 1", "address": "ADDR1"}],
                        "activeAccount": {"name": "Account 1", "address": "ADDR1"}
                    }
                },
                "activeWallet": "walletconnect",
                "activeNetwork": "mainnet"
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let states = vec![
            SessionState::default(),
            two_wallets(),
            two_wallets().set_active_wallet(None),
            two_wallets().set_accounts(WalletId::Pera, &[]),
            two_wallets().set_active_network(NetworkId::Localnet),
        ];
        for state in states {
            let json = state.to_json().unwrap();
            assert_eq!(SessionState::from_json(&json).unwrap(), state);
        }
    }

    #[test]
    fn test_rejects_unknown_wallet_id() {
        let json = json!({
            "wallets": {
                "pera": {"accounts": [], "activeAccount": null},
                "mystery": {"accounts": [], "activeAccount": null}
            },
            "activeWallet": null,
            "activeNetwork": "testnet"
        });
        assert!(matches!(
            SessionState::validate(json),
            Err(SessionError::Shape(_))
        ));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let cases = vec![
            // extra top-level field
            json!({"wallets": {}, "activeWallet": null, "activeNetwork": "testnet", "x": 1}),
            // missing activeWallet
            json!({"wallets": {}, "activeNetwork": "testnet"}),
            // unknown network
            json!({"wallets": {}, "activeWallet": null, "activeNetwork": "moon"}),
            // account without address
            json!({
                "wallets": {"kmd": {"accounts": [{"name": "a"}], "activeAccount": null}},
                "activeWallet": null,
                "activeNetwork": "testnet"
            }),
            // missing activeAccount
            json!({
                "wallets": {"kmd": {"accounts": []}},
                "activeWallet": null,
                "activeNetwork": "testnet"
            }),
        ];
        for case in cases {
            assert!(SessionState::validate(case).is_err());
        }
    }

    #[test]
    fn test_rejects_broken_invariants() {
        let duplicate = json!({
            "wallets": {"kmd": {
                "accounts": [{"name": "a", "address": "A"}, {"name": "b", "address": "A"}],
                "activeAccount": null
            }},
            "activeWallet": "kmd",
            "activeNetwork": "testnet"
        });
        assert!(matches!(
            SessionState::validate(duplicate),
            Err(SessionError::DuplicateAddress { .. })
        ));

        let foreign_account = json!({
            "wallets": {"kmd": {
                "accounts": [{"name": "a", "address": "A"}],
                "activeAccount": {"name": "b", "address": "B"}
            }},
            "activeWallet": "kmd",
            "activeNetwork": "testnet"
        });
        assert!(matches!(
            SessionState::validate(foreign_account),
            Err(SessionError::UnknownActiveAccount { .. })
        ));
    }

    #[test]
    fn test_accepts_disconnected_active_wallet() {
        let state = two_wallets().set_active_wallet(Some(WalletId::Lute));
        let restored = SessionState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored, state);
        assert!(restored.active_wallet_state().is_none());
    }

    #[test]
    fn test_duplicate_addresses_are_dropped() {
        let dup = WalletAccount::new("Copy", "ADDR1");
        let state = SessionState::default().add_wallet(
            WalletId::Pera,
            &WalletState {
                accounts: vec![account(1), dup.clone(), account(2)],
                active_account: Some(dup),
            },
        );
        let pera = &state.wallets[&WalletId::Pera];
        assert_eq!(pera.accounts, vec![account(1), account(2)]);
        assert_eq!(pera.active_account, Some(account(1)));

        let replaced = state.set_accounts(WalletId::Pera, &[account(3), account(3)]);
        assert_eq!(replaced.wallets[&WalletId::Pera].accounts, vec![account(3)]);
    }

    #[test]
    fn test_foreign_active_account_is_repointed() {
        let state = SessionState::default().add_wallet(
            WalletId::Kmd,
            &WalletState {
                accounts: vec![account(1), account(2)],
                active_account: Some(account(7)),
            },
        );
        assert_eq!(
            state.wallets[&WalletId::Kmd].active_account,
            Some(account(1))
        );
    }

    #[test]
    fn test_mutation_results_restore() {
        let base = two_wallets();
        let states = vec![
            base.add_wallet(
                WalletId::Exodus,
                &WalletState::from_accounts(vec![account(4), account(4)]),
            ),
            base.set_active_wallet(Some(WalletId::Magic)),
            base.set_active_account(WalletId::Pera, "ADDR2"),
            base.set_accounts(WalletId::Defly, &[account(5), account(6), account(5)]),
            base.remove_wallet(WalletId::Defly),
            base.set_active_network(NetworkId::Fnet),
        ];
        for state in states {
            let json = state.to_json().unwrap();
            assert_eq!(SessionState::from_json(&json).unwrap(), state);
        }
    }

    #[test]
    fn test_wallet_id_parsing() {
        for id in WalletId::ALL {
            assert_eq!(id.as_str().parse::<WalletId>().unwrap(), id);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
        assert!("unknown".parse::<WalletId>().is_err());
    }
}
