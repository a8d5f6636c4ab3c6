//! Transaction co-signing engine
//!
//! Lets one signing call cover groups that mix transactions from several
//! signers, some of them already signed:
//! - Normalization of every accepted input shape into ordered slots
//! - Per-slot signer eligibility against the wallet's connected addresses
//! - Provider-facing batch requests
//! - Merging of sparse or full-length provider responses

pub mod eligibility;
pub mod engine;
pub mod merge;
pub mod normalize;
pub mod request;

pub use eligibility::{resolve, Eligibility};
pub use engine::{plan, sign_transactions, SignError, SignOptions, SignPhase, SigningPlan};
pub use merge::{merge_signed, MergeError, SignedEntry};
pub use normalize::{normalize, TransactionGroup, TransactionSlot, TxnInput};
pub use request::{build_requests, SignRequestItem};
