//! Session configuration
//!
//! Storage location, default network, node endpoints per network and the
//! optional signing deadline handed to providers.

use crate::session::NetworkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Key under which the session is persisted
pub const DEFAULT_STORAGE_KEY: &str = "wallet-session:v1";

/// Node endpoint for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub url: String,
    #[serde(default)]
    pub token: String,
}

impl NodeEndpoint {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            token: String::new(),
        }
    }
}

/// Live client handle for the active network (never persisted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkClient {
    pub network: NetworkId,
    pub endpoint: NodeEndpoint,
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub default_network: NetworkId,
    pub networks: BTreeMap<NetworkId, NodeEndpoint>,
    /// Deadline handed to providers for each signing request; `None` waits forever
    pub sign_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let networks = BTreeMap::from([
            (
                NetworkId::Mainnet,
                NodeEndpoint::new("https://mainnet-api.algonode.cloud"),
            ),
            (
                NetworkId::Testnet,
                NodeEndpoint::new("https://testnet-api.algonode.cloud"),
            ),
            (
                NetworkId::Betanet,
                NodeEndpoint::new("https://betanet-api.algonode.cloud"),
            ),
            (
                NetworkId::Fnet,
                NodeEndpoint::new("https://fnet-api.4160.nodely.io"),
            ),
            (
                NetworkId::Localnet,
                NodeEndpoint {
                    url: "http://localhost:4001".to_string(),
                    token: "a".repeat(64),
                },
            ),
        ]);

        Self {
            data_dir: PathBuf::from(".wallet_session"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_network: NetworkId::Testnet,
            networks,
            sign_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Build the client handle for a network, falling back to localhost
    pub fn client_for(&self, network: NetworkId) -> NetworkClient {
        let endpoint = self.networks.get(&network).cloned().unwrap_or_else(|| {
            log::warn!("No endpoint configured for {}, using localhost", network);
            NodeEndpoint::new("http://localhost:4001")
        });
        NetworkClient { network, endpoint }
    }
}
