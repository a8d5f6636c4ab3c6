//! Provider-facing signing requests

use crate::signing::eligibility::Eligibility;
use crate::signing::normalize::TransactionSlot;
use crate::txn::TxnError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One item of a batch signing request
///
/// An item with an empty `signers` list tells the wallet not to sign that
/// slot; it is only there so the wallet sees the whole group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequestItem {
    /// Base64 encoding of the bare transaction
    pub txn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signers: Option<Vec<String>>,
}

impl SignRequestItem {
    /// Item the wallet should sign
    pub fn to_sign(unsigned: &[u8]) -> Self {
        Self {
            txn: STANDARD.encode(unsigned),
            signers: None,
        }
    }

    /// Item the wallet must leave alone
    pub fn skip(unsigned: &[u8]) -> Self {
        Self {
            txn: STANDARD.encode(unsigned),
            signers: Some(Vec::new()),
        }
    }

    pub fn should_sign(&self) -> bool {
        !matches!(&self.signers, Some(signers) if signers.is_empty())
    }

    /// Decoded transaction bytes
    pub fn txn_bytes(&self) -> Result<Vec<u8>, TxnError> {
        Ok(STANDARD.decode(&self.txn)?)
    }
}

/// Build one request item per slot
pub fn build_requests(slots: &[TransactionSlot], decisions: &[Eligibility]) -> Vec<SignRequestItem> {
    slots
        .iter()
        .zip(decisions)
        .map(|(slot, decision)| {
            if decision.should_sign {
                SignRequestItem::to_sign(&slot.unsigned)
            } else {
                SignRequestItem::skip(&slot.unsigned)
            }
        })
        .collect()
}
