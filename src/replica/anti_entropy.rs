//! Anti-entropy: a periodic two-phase push-pull exchange that repairs whatever rumor mongering
//! missed.
//!
//! 1. Initiator sends its whole state to a random neighbor (probe).
//! 2. Receiver diffs it against its own state and replies with its state, the keys it needs, and
//!    the values it can donate.
//! 3. Initiator applies the donations, then sends back values for the needed keys (final).
//! 4. Receiver applies those. Done.
//!
//! Nothing is remembered between steps; every message carries what the next step needs.

use crate::replica::{Version, VersionedValue};
use crate::wire::{VersionMap, VersionedValueMap};
use std::collections::BTreeSet;

/// Receiver side of the diff, in terms of the two states only.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Reconciliation {
    /// Keys where the initiator is ahead of us (or we lack the key). We want these.
    pub(crate) needed: VersionMap,
    /// Keys where we're ahead of the initiator (or it lacks the key). We donate these.
    pub(crate) offered: VersionMap,
}

pub(crate) fn reconcile(initiator_state: &VersionMap, receiver_state: &VersionMap) -> Reconciliation {
    let mut needed = VersionMap::new();
    let mut offered = VersionMap::new();

    let all_keys: BTreeSet<&String> = initiator_state.keys().chain(receiver_state.keys()).collect();
    for key in all_keys {
        let theirs = version_in(initiator_state, key);
        let ours = version_in(receiver_state, key);

        if theirs > ours {
            needed.insert(key.clone(), theirs);
        } else if ours > theirs {
            offered.insert(key.clone(), ours);
        }
    }

    Reconciliation { needed, offered }
}

/// Picks the entries worth sending to a peer whose state is `peer_state`: anything requested for
/// which we still hold a newer version than the peer does. `lookup` returns our current entry.
pub(crate) fn collect_updates<F>(requested: &VersionMap, peer_state: &VersionMap, mut lookup: F) -> VersionedValueMap
where
    F: FnMut(&str) -> Option<VersionedValue>,
{
    let mut updates = VersionedValueMap::new();
    for key in requested.keys() {
        if let Some(entry) = lookup(key) {
            if entry.version > version_in(peer_state, key) {
                updates.insert(key.clone(), entry);
            }
        }
    }

    updates
}

fn version_in(state: &VersionMap, key: &str) -> Version {
    state.get(key).copied().unwrap_or_else(Version::unseen)
}
