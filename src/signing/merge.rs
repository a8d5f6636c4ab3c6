//! Merging provider responses back into the group
//!
//! Wallets answer in several shapes: base64 strings, plain byte arrays,
//! index-keyed byte objects, sparse or full-length arrays with nulls. All of
//! it is normalized here so nothing downstream has to guess.

use crate::provider::ResponseLayout;
use crate::signing::eligibility::{eligible_count, Eligibility};
use crate::signing::normalize::TransactionSlot;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors while reconciling a provider response
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MergeError {
    #[error("Invalid signed entry: {0}")]
    InvalidEntry(String),
    #[error("Expected {expected} response entries, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Provider returned {actual} entries for {expected} transactions to sign")]
    TooManyEntries { expected: usize, actual: usize },
}

/// A signed transaction as returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignedEntry {
    Base64(String),
    Bytes(Vec<u8>),
    /// Byte array serialized as an object keyed by position
    Indexed(BTreeMap<String, u8>),
}

impl SignedEntry {
    /// Detect the representation of one JSON response entry
    pub fn from_json(value: Value) -> Result<Option<Self>, MergeError> {
        serde_json::from_value(value).map_err(|e| MergeError::InvalidEntry(e.to_string()))
    }

    /// Canonical bytes
    pub fn into_bytes(self) -> Result<Vec<u8>, MergeError> {
        match self {
            SignedEntry::Base64(encoded) => STANDARD
                .decode(encoded)
                .map_err(|e| MergeError::InvalidEntry(e.to_string())),
            SignedEntry::Bytes(bytes) => Ok(bytes),
            SignedEntry::Indexed(map) => {
                let mut indexed = map
                    .into_iter()
                    .map(|(k, v)| {
                        k.parse::<usize>()
                            .map(|i| (i, v))
                            .map_err(|_| MergeError::InvalidEntry(format!("bad byte index {}", k)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                indexed.sort_by_key(|(i, _)| *i);

                if indexed.iter().enumerate().any(|(pos, (i, _))| pos != *i) {
                    return Err(MergeError::InvalidEntry(
                        "byte indexes are not contiguous".to_string(),
                    ));
                }
                Ok(indexed.into_iter().map(|(_, v)| v).collect())
            }
        }
    }
}

impl From<Vec<u8>> for SignedEntry {
    fn from(bytes: Vec<u8>) -> Self {
        SignedEntry::Bytes(bytes)
    }
}

/// Line the response up with the slots: one optional entry per slot
fn align(
    decisions: &[Eligibility],
    response: Vec<Option<SignedEntry>>,
    layout: ResponseLayout,
) -> Result<Vec<Option<SignedEntry>>, MergeError> {
    let layout = match layout {
        ResponseLayout::Auto if response.len() == decisions.len() => ResponseLayout::FullLength,
        ResponseLayout::Auto => ResponseLayout::Sparse,
        other => other,
    };

    match layout {
        ResponseLayout::FullLength => {
            if response.len() != decisions.len() {
                return Err(MergeError::LengthMismatch {
                    expected: decisions.len(),
                    actual: response.len(),
                });
            }
            Ok(decisions
                .iter()
                .zip(response)
                .map(|(d, entry)| if d.should_sign { entry } else { None })
                .collect())
        }
        _ => {
            let expected = eligible_count(decisions);
            if response.len() > expected {
                return Err(MergeError::TooManyEntries {
                    expected,
                    actual: response.len(),
                });
            }
            if response.len() < expected {
                log::debug!(
                    "Provider returned {} of {} entries, treating the rest as skipped",
                    response.len(),
                    expected
                );
            }
            let mut entries = response.into_iter();
            Ok(decisions
                .iter()
                .map(|d| {
                    if d.should_sign {
                        entries.next().flatten()
                    } else {
                        None
                    }
                })
                .collect())
        }
    }
}

/// Reassemble the final result, one entry per slot
///
/// With `return_group` every slot the wallet did not sign carries its
/// original encoding, so the output is a complete group. Without it those
/// slots are `None`.
pub fn merge_signed(
    slots: &[TransactionSlot],
    decisions: &[Eligibility],
    response: Vec<Option<SignedEntry>>,
    layout: ResponseLayout,
    return_group: bool,
) -> Result<Vec<Option<Vec<u8>>>, MergeError> {
    let aligned = align(decisions, response, layout)?;

    slots
        .iter()
        .zip(aligned)
        .map(|(slot, entry)| match entry {
            Some(entry) => entry.into_bytes().map(Some),
            None if return_group => Ok(Some(slot.original.clone())),
            None => Ok(None),
        })
        .collect()
}
