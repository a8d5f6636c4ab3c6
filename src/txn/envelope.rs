//! Partial decoding of encoded transactions
//!
//! Determines whether an encoding is a bare transaction or a signed wrapper
//! without the caller knowing in advance which one it holds.

use crate::txn::transaction::{SignedTransaction, Transaction};
use crate::txn::TxnError;
use serde_json::Value;

/// Key that marks an encoding as a signed wrapper
const SIGNED_TXN_KEY: &str = "txn";

/// A decoded transaction envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Unsigned(Transaction),
    Signed(SignedTransaction),
}

impl Envelope {
    /// Decode an encoding, detecting signed wrappers by their `txn` key
    pub fn decode(bytes: &[u8]) -> Result<Self, TxnError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let is_signed = match &value {
            Value::Object(map) => map.contains_key(SIGNED_TXN_KEY),
            _ => return Err(TxnError::NotAnEnvelope),
        };

        if is_signed {
            Ok(Envelope::Signed(serde_json::from_value(value)?))
        } else {
            Ok(Envelope::Unsigned(serde_json::from_value(value)?))
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Envelope::Signed(_))
    }

    /// The inner transaction
    pub fn transaction(&self) -> &Transaction {
        match self {
            Envelope::Unsigned(txn) => txn,
            Envelope::Signed(signed) => &signed.txn,
        }
    }

    /// Address that authorizes this transaction
    pub fn signer(&self) -> &str {
        match self {
            Envelope::Unsigned(txn) => &txn.sender,
            Envelope::Signed(signed) => signed.auth_signer.as_deref().unwrap_or(&signed.txn.sender),
        }
    }

    /// Encoding of the bare inner transaction, as handed to a signer
    pub fn unsigned_bytes(&self) -> Result<Vec<u8>, TxnError> {
        self.transaction().encode()
    }
}
