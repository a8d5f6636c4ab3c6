//! Wallet provider interface
//!
//! Every wallet backend implements [`WalletProvider`]. The co-signing engine
//! only talks to this trait, so callers never need to know which backend
//! holds the keys.

pub mod deadline;
pub mod mock;

pub use deadline::with_timeout;
pub use mock::{EntryFormat, MockProvider};

use crate::session::{WalletAccount, WalletId};
use crate::signing::{SignRequestItem, SignedEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Codes
// =============================================================================

/// The user declined the request in the wallet
pub const ERR_USER_REJECTED: i64 = 4001;

/// The wallet is not connected or not authorized
pub const ERR_UNAUTHORIZED: i64 = 4100;

/// The provider does not support the request
pub const ERR_UNSUPPORTED: i64 = 4200;

/// The request did not complete before its deadline
pub const ERR_TIMEOUT: i64 = 4300;

/// Structured error reported by a wallet provider
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn rejected() -> Self {
        Self::new(ERR_USER_REJECTED, "User rejected the request")
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            ERR_TIMEOUT,
            &format!("Request timed out after {}ms", limit.as_millis()),
        )
    }
}

/// How a provider lays out its signing response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseLayout {
    /// One entry per slot to sign, in request order
    Sparse,
    /// One entry per request item, indexed by slot
    FullLength,
    /// Full-length when the response covers every slot, sparse otherwise
    #[default]
    Auto,
}

/// Capability interface implemented once per wallet backend
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn id(&self) -> WalletId;

    fn response_layout(&self) -> ResponseLayout {
        ResponseLayout::Auto
    }

    /// Establish a session and return the authorized accounts
    async fn connect(&self) -> Result<Vec<WalletAccount>, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// Re-establish a persisted session
    ///
    /// `Ok(None)` means the backend no longer has a session for this app.
    async fn resume_session(&self) -> Result<Option<Vec<WalletAccount>>, ProviderError>;

    /// Ask the wallet to sign a batch
    ///
    /// Items carrying an empty `signers` list must not be signed. Providers
    /// honour `timeout` through [`with_timeout`].
    async fn sign_batch(
        &self,
        requests: &[SignRequestItem],
        timeout: Option<Duration>,
    ) -> Result<Vec<Option<SignedEntry>>, ProviderError>;
}
