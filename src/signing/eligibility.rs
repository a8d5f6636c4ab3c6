//! Signer eligibility
//!
//! Decides, per slot, whether this call should ask the wallet to sign it.
//! A slot is eligible when it is selected (or no selection was given), its
//! signer is one of the wallet's connected addresses, and it is not already
//! signed.

use crate::signing::normalize::TransactionSlot;
use std::collections::HashSet;

/// Eligibility decision for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub index: usize,
    pub should_sign: bool,
    /// Authorizing address read from the transaction
    pub signer: String,
}

/// Resolve eligibility for every slot
pub fn resolve(
    slots: &[TransactionSlot],
    connected: &HashSet<String>,
    indexes_to_sign: Option<&[usize]>,
) -> Vec<Eligibility> {
    slots
        .iter()
        .map(|slot| {
            let selected = indexes_to_sign.map_or(true, |indexes| indexes.contains(&slot.index));
            let authorized = connected.contains(&slot.signer);

            if selected && !authorized && indexes_to_sign.is_some() {
                log::debug!(
                    "Slot {} selected but signer {} is not connected",
                    slot.index,
                    slot.signer
                );
            }

            Eligibility {
                index: slot.index,
                should_sign: selected && authorized && !slot.is_pre_signed,
                signer: slot.signer.clone(),
            }
        })
        .collect()
}

/// Number of slots the wallet is asked to sign
pub fn eligible_count(decisions: &[Eligibility]) -> usize {
    decisions.iter().filter(|d| d.should_sign).count()
}
