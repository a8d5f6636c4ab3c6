//! Transaction and signed-transaction envelopes
//!
//! Transactions are encoded canonically as JSON bytes. A signed transaction
//! is a wrapper object carrying the signature next to the transaction under
//! the `txn` key. Atomic groups share a group id derived from the ids of
//! their members.

use crate::txn::TxnError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Domain separation prefix for transaction ids
pub const TX_ID_PREFIX: &[u8] = b"TX";

/// Domain separation prefix for group ids
pub const GROUP_ID_PREFIX: &[u8] = b"TG";

/// Maximum number of transactions in one atomic group
pub const MAX_GROUP_SIZE: usize = 16;

/// Default fee for new transactions
pub const DEFAULT_FEE: u64 = 1_000;

/// Default validity window (rounds) for new transactions
pub const DEFAULT_VALIDITY_WINDOW: u64 = 1_000;

// =============================================================================
// Group Id
// =============================================================================

/// 32-byte identifier linking the members of an atomic group
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub [u8; 32]);

impl GroupId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, TxnError> {
        let bytes = hex::decode(s).map_err(|_| TxnError::InvalidGroupId(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TxnError::InvalidGroupId(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.to_hex())
    }
}

impl Serialize for GroupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GroupId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Kind of on-chain operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxnType {
    #[serde(rename = "pay")]
    Payment,
    #[serde(rename = "axfer")]
    AssetTransfer,
    #[serde(rename = "appl")]
    AppCall,
    #[serde(rename = "keyreg")]
    KeyRegistration,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// A bare, unsigned transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TxnType,
    /// Authorizing address, the account that must sign
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub amount: u64,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

impl Transaction {
    /// Create a transaction of the given kind with default fee and validity
    pub fn new(kind: TxnType, sender: &str) -> Self {
        Self {
            kind,
            sender: sender.to_string(),
            receiver: None,
            amount: 0,
            fee: DEFAULT_FEE,
            first_valid: 1,
            last_valid: 1 + DEFAULT_VALIDITY_WINDOW,
            genesis_id: None,
            note: None,
            group: None,
        }
    }

    /// Create a payment
    pub fn payment(sender: &str, receiver: &str, amount: u64) -> Self {
        Self {
            receiver: Some(receiver.to_string()),
            amount,
            ..Self::new(TxnType::Payment, sender)
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    /// Canonical byte encoding
    pub fn encode(&self) -> Result<Vec<u8>, TxnError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a bare transaction encoding
    pub fn decode(bytes: &[u8]) -> Result<Self, TxnError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Raw 32-byte transaction id
    pub fn raw_id(&self) -> Result<[u8; 32], TxnError> {
        let mut hasher = Sha256::new();
        hasher.update(TX_ID_PREFIX);
        hasher.update(self.encode()?);
        let mut id = [0u8; 32];
        id.copy_from_slice(&hasher.finalize());
        Ok(id)
    }

    /// Transaction id as hex
    pub fn id(&self) -> Result<String, TxnError> {
        Ok(hex::encode(self.raw_id()?))
    }
}

/// Compute the group id for a set of transactions and stamp it on each one
///
/// Any group id already present is cleared before hashing, so re-grouping a
/// set of transactions is stable.
pub fn assign_group_id(txns: &mut [Transaction]) -> Result<GroupId, TxnError> {
    if txns.is_empty() {
        return Err(TxnError::EmptyGroup);
    }
    if txns.len() > MAX_GROUP_SIZE {
        return Err(TxnError::GroupTooLarge {
            size: txns.len(),
            max: MAX_GROUP_SIZE,
        });
    }

    let mut hasher = Sha256::new();
    hasher.update(GROUP_ID_PREFIX);
    for txn in txns.iter_mut() {
        txn.group = None;
        hasher.update(txn.raw_id()?);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    let group = GroupId(digest);

    for txn in txns.iter_mut() {
        txn.group = Some(group);
    }

    Ok(group)
}

// =============================================================================
// Signed Transaction
// =============================================================================

/// A transaction wrapped together with its signature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Signature (opaque to this crate)
    pub sig: String,
    /// Authorizing address when it differs from the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_signer: Option<String>,
    pub txn: Transaction,
}

impl SignedTransaction {
    pub fn new(txn: Transaction, sig: String) -> Self {
        Self {
            sig,
            auth_signer: None,
            txn,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TxnError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TxnError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
