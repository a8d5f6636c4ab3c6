//! Transaction envelopes
//!
//! This module provides:
//! - Bare and signed transaction types with canonical encoding
//! - Group id assignment for atomic groups
//! - Envelope detection (signed wrapper vs bare transaction)

pub mod envelope;
pub mod transaction;

pub use envelope::Envelope;
pub use transaction::{
    assign_group_id, GroupId, SignedTransaction, Transaction, TxnType, MAX_GROUP_SIZE,
};

use thiserror::Error;

/// Transaction encoding errors
#[derive(Error, Debug)]
pub enum TxnError {
    #[error("Malformed transaction encoding: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Encoding is not a transaction envelope")]
    NotAnEnvelope,
    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Invalid group id: {0}")]
    InvalidGroupId(String),
    #[error("Cannot group an empty set of transactions")]
    EmptyGroup,
    #[error("Group of {size} transactions exceeds the maximum of {max}")]
    GroupTooLarge { size: usize, max: usize },
    #[error("Unsupported transaction group shape: {0}")]
    UnsupportedShape(String),
}
