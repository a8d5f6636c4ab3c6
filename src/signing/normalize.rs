//! Transaction group normalization
//!
//! Callers may hand over a bare transaction, an encoding, a flat list of
//! either, or a list of lists. All of them flatten into one ordered sequence
//! of slots. Nesting carries no meaning of its own: atomic-group membership
//! lives in the group id inside each transaction.

use crate::txn::{Envelope, GroupId, SignedTransaction, Transaction, TxnError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// One element of a transaction group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnInput {
    Transaction(Transaction),
    Encoded(Vec<u8>),
}

impl TxnInput {
    /// Canonical encoding of this element
    pub fn into_bytes(self) -> Result<Vec<u8>, TxnError> {
        match self {
            TxnInput::Transaction(txn) => txn.encode(),
            TxnInput::Encoded(bytes) => Ok(bytes),
        }
    }

    fn from_json(value: &Value) -> Result<Self, TxnError> {
        match value {
            Value::String(encoded) => Ok(TxnInput::Encoded(STANDARD.decode(encoded)?)),
            Value::Object(map) if map.contains_key("txn") => {
                let signed: SignedTransaction = serde_json::from_value(value.clone())?;
                Ok(TxnInput::Encoded(signed.encode()?))
            }
            Value::Object(_) => Ok(TxnInput::Transaction(serde_json::from_value(
                value.clone(),
            )?)),
            other => Err(TxnError::UnsupportedShape(format!(
                "expected a base64 string or a transaction object, got {}",
                other
            ))),
        }
    }
}

impl From<Transaction> for TxnInput {
    fn from(txn: Transaction) -> Self {
        TxnInput::Transaction(txn)
    }
}

impl From<Vec<u8>> for TxnInput {
    fn from(bytes: Vec<u8>) -> Self {
        TxnInput::Encoded(bytes)
    }
}

/// Every accepted input shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionGroup {
    Transaction(Transaction),
    Encoded(Vec<u8>),
    List(Vec<TxnInput>),
    Groups(Vec<Vec<TxnInput>>),
}

impl TransactionGroup {
    /// Flatten into one ordered list of elements
    pub fn flatten(self) -> Vec<TxnInput> {
        match self {
            TransactionGroup::Transaction(txn) => vec![TxnInput::Transaction(txn)],
            TransactionGroup::Encoded(bytes) => vec![TxnInput::Encoded(bytes)],
            TransactionGroup::List(items) => items,
            TransactionGroup::Groups(groups) => groups.into_iter().flatten().collect(),
        }
    }

    /// Read a group from JSON
    ///
    /// Strings are base64 encodings and objects are transactions (or signed
    /// wrappers); arrays may nest at most twice.
    pub fn from_json(value: &Value) -> Result<Self, TxnError> {
        let Value::Array(items) = value else {
            return Ok(match TxnInput::from_json(value)? {
                TxnInput::Transaction(txn) => TransactionGroup::Transaction(txn),
                TxnInput::Encoded(bytes) => TransactionGroup::Encoded(bytes),
            });
        };

        let nested = items.iter().filter(|v| v.is_array()).count();
        if nested == 0 {
            let list = items
                .iter()
                .map(TxnInput::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(TransactionGroup::List(list));
        }
        if nested != items.len() {
            return Err(TxnError::UnsupportedShape(
                "cannot mix transactions and groups at the same level".to_string(),
            ));
        }

        let mut groups = Vec::with_capacity(items.len());
        for group in items {
            let members = group.as_array().map(Vec::as_slice).unwrap_or_default();
            let inputs = members
                .iter()
                .map(|member| {
                    if member.is_array() {
                        Err(TxnError::UnsupportedShape(
                            "groups cannot nest more than twice".to_string(),
                        ))
                    } else {
                        TxnInput::from_json(member)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(inputs);
        }
        Ok(TransactionGroup::Groups(groups))
    }
}

impl From<Transaction> for TransactionGroup {
    fn from(txn: Transaction) -> Self {
        TransactionGroup::Transaction(txn)
    }
}

impl From<Vec<u8>> for TransactionGroup {
    fn from(bytes: Vec<u8>) -> Self {
        TransactionGroup::Encoded(bytes)
    }
}

impl From<Vec<Transaction>> for TransactionGroup {
    fn from(txns: Vec<Transaction>) -> Self {
        TransactionGroup::List(txns.into_iter().map(TxnInput::from).collect())
    }
}

impl From<Vec<Vec<u8>>> for TransactionGroup {
    fn from(encoded: Vec<Vec<u8>>) -> Self {
        TransactionGroup::List(encoded.into_iter().map(TxnInput::from).collect())
    }
}

impl From<Vec<TxnInput>> for TransactionGroup {
    fn from(items: Vec<TxnInput>) -> Self {
        TransactionGroup::List(items)
    }
}

impl From<Vec<Vec<Transaction>>> for TransactionGroup {
    fn from(groups: Vec<Vec<Transaction>>) -> Self {
        TransactionGroup::Groups(
            groups
                .into_iter()
                .map(|g| g.into_iter().map(TxnInput::from).collect())
                .collect(),
        )
    }
}

impl From<Vec<Vec<Vec<u8>>>> for TransactionGroup {
    fn from(groups: Vec<Vec<Vec<u8>>>) -> Self {
        TransactionGroup::Groups(
            groups
                .into_iter()
                .map(|g| g.into_iter().map(TxnInput::from).collect())
                .collect(),
        )
    }
}

/// One position in a normalized group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSlot {
    pub index: usize,
    /// Bytes exactly as the caller supplied them
    pub original: Vec<u8>,
    /// Encoding of the bare transaction, as handed to a signer
    pub unsigned: Vec<u8>,
    pub is_pre_signed: bool,
    /// Authorizing address
    pub signer: String,
    pub group: Option<GroupId>,
}

/// Flatten a group and decode each element's envelope
pub fn normalize(group: TransactionGroup) -> Result<Vec<TransactionSlot>, TxnError> {
    group
        .flatten()
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let original = input.into_bytes()?;
            let envelope = Envelope::decode(&original)?;
            Ok(TransactionSlot {
                index,
                unsigned: envelope.unsigned_bytes()?,
                is_pre_signed: envelope.is_signed(),
                signer: envelope.signer().to_string(),
                group: envelope.transaction().group,
                original,
            })
        })
        .collect()
}
