//! Co-signing pipeline
//!
//! normalize → resolve eligibility → build request → provider → merge.
//! The session store is only read here; a failed call leaves it untouched.

use crate::provider::{ProviderError, WalletProvider};
use crate::session::SessionStore;
use crate::signing::eligibility::{eligible_count, resolve, Eligibility};
use crate::signing::merge::{merge_signed, MergeError};
use crate::signing::normalize::{normalize, TransactionGroup, TransactionSlot};
use crate::signing::request::{build_requests, SignRequestItem};
use crate::txn::TxnError;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Signing pipeline errors
#[derive(Error, Debug)]
pub enum SignError {
    #[error("Invalid transaction input: {0}")]
    Transaction(#[from] TxnError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Could not merge signed transactions: {0}")]
    Merge(#[from] MergeError),
}

/// Phases of one signing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignPhase {
    Requested,
    Normalized,
    EligibilityResolved,
    ProviderCalled,
    Merged,
    Returned,
    Failed,
}

impl fmt::Display for SignPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignPhase::Requested => "requested",
            SignPhase::Normalized => "normalized",
            SignPhase::EligibilityResolved => "eligibility-resolved",
            SignPhase::ProviderCalled => "provider-called",
            SignPhase::Merged => "merged",
            SignPhase::Returned => "returned",
            SignPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Options for [`sign_transactions`]
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Restrict signing to these slot indexes
    pub indexes_to_sign: Option<Vec<usize>>,
    /// Fill unsigned slots with their original encoding instead of `None`
    pub return_group: bool,
    /// Deadline handed to the provider
    pub timeout: Option<Duration>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            indexes_to_sign: None,
            return_group: true,
            timeout: None,
        }
    }
}

impl SignOptions {
    pub fn indexes(mut self, indexes: &[usize]) -> Self {
        self.indexes_to_sign = Some(indexes.to_vec());
        self
    }

    pub fn return_group(mut self, return_group: bool) -> Self {
        self.return_group = return_group;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Everything decided before the provider is called
#[derive(Debug, Clone)]
pub struct SigningPlan {
    pub slots: Vec<TransactionSlot>,
    pub decisions: Vec<Eligibility>,
    pub requests: Vec<SignRequestItem>,
}

impl SigningPlan {
    pub fn eligible_count(&self) -> usize {
        eligible_count(&self.decisions)
    }
}

/// Normalize a group and decide what to ask the wallet for
pub fn plan(
    group: TransactionGroup,
    connected: &HashSet<String>,
    indexes_to_sign: Option<&[usize]>,
) -> Result<SigningPlan, TxnError> {
    let slots = normalize(group)?;
    let decisions = resolve(&slots, connected, indexes_to_sign);
    let requests = build_requests(&slots, &decisions);
    Ok(SigningPlan {
        slots,
        decisions,
        requests,
    })
}

/// Sign a transaction group through `provider`
///
/// The addresses the provider may sign for are read from the store entry of
/// the provider's wallet. The result has one entry per input slot.
pub async fn sign_transactions(
    store: &SessionStore,
    provider: &dyn WalletProvider,
    group: impl Into<TransactionGroup>,
    options: SignOptions,
) -> Result<Vec<Option<Vec<u8>>>, SignError> {
    let wallet_id = provider.id();
    let trace = |phase: SignPhase| log::debug!("[{}] sign_transactions: {}", wallet_id, phase);

    trace(SignPhase::Requested);
    let connected = store.state().connected_addresses(wallet_id);
    let SigningPlan {
        slots,
        decisions,
        requests,
    } = plan(
        group.into(),
        &connected,
        options.indexes_to_sign.as_deref(),
    )?;
    trace(SignPhase::Normalized);
    trace(SignPhase::EligibilityResolved);

    if slots.is_empty() {
        trace(SignPhase::Returned);
        return Ok(Vec::new());
    }

    log::info!(
        "[{}] Requesting {} of {} transaction(s) to be signed",
        wallet_id,
        eligible_count(&decisions),
        slots.len()
    );

    let response = match provider.sign_batch(&requests, options.timeout).await {
        Ok(response) => response,
        Err(e) => {
            trace(SignPhase::Failed);
            log::error!("[{}] Signing failed: {}", wallet_id, e);
            return Err(e.into());
        }
    };
    trace(SignPhase::ProviderCalled);

    let merged = match merge_signed(
        &slots,
        &decisions,
        response,
        provider.response_layout(),
        options.return_group,
    ) {
        Ok(merged) => merged,
        Err(e) => {
            trace(SignPhase::Failed);
            log::error!("[{}] Could not merge provider response: {}", wallet_id, e);
            return Err(e.into());
        }
    };
    trace(SignPhase::Merged);

    trace(SignPhase::Returned);
    Ok(merged)
}
