//! Controlled-address resolution.
//!
//! The set starts with the transaction sender and its top-level callee and
//! grows along call edges: if a controlled address calls another address, the
//! callee becomes controlled as well.

use crate::model::{CallFrame, TransactionTrace};
use crate::walker::fold_calls;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the call graph is closed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// One pre-order pass. Misses control established later in visitation order.
    SinglePass,
    /// Repeat the pass until the set stops growing.
    #[default]
    FixedPoint,
}

/// Addresses acting as a single economic actor within one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlledAddressSet {
    addresses: BTreeSet<Address>,
}

impl ControlledAddressSet {
    /// Seed a set with the transaction's sender and callee.
    pub fn seeded(from: Address, to: Address) -> Self {
        Self {
            addresses: BTreeSet::from([from, to]),
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }
}

impl FromIterator<Address> for ControlledAddressSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

/// One pre-order pass returning the grown set.
fn expand_once(root: &CallFrame, seed: BTreeSet<Address>) -> BTreeSet<Address> {
    fold_calls(root, seed, |mut set, call| {
        if set.contains(&call.from) {
            set.insert(call.to);
        }
        set
    })
}

/// Resolve the controlled-address set of a trace.
///
/// # Arguments
/// * `trace` - The transaction trace
/// * `mode` - Single pass or fixed-point closure
///
/// # Returns
/// The resolved set. Resolution is deterministic and idempotent.
pub fn resolve_controlled(trace: &TransactionTrace, mode: ResolutionMode) -> ControlledAddressSet {
    let seed = BTreeSet::from([trace.sender(), trace.callee()]);
    let mut current = expand_once(&trace.root, seed);

    if mode == ResolutionMode::FixedPoint {
        loop {
            let next = expand_once(&trace.root, current.clone());
            // The set only grows, so equal size means nothing was added
            if next.len() == current.len() {
                break;
            }
            current = next;
        }
    }

    ControlledAddressSet { addresses: current }
}
