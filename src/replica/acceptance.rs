use crate::replica::Version;

/// Outcome of offering an update to a replica. Shared by local writes, rumors and anti-entropy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Acceptance {
    /// Strictly newer than what we had. Stored.
    Accepted,
    /// Same version and value as ours, or older. Dropped.
    Stale,
    /// Same version as ours but a different value. Dropped, and left for quorum reads to sort out;
    /// there is no tie-breaker.
    Conflict,
}

/// The monotonic acceptance rule. `stored_value` is only consulted when the versions are equal.
pub(crate) fn judge<F>(current: Version, incoming: Version, incoming_value: &str, stored_value: F) -> Acceptance
where
    F: FnOnce() -> Option<String>,
{
    if incoming > current {
        Acceptance::Accepted
    } else if incoming == current && !current.is_unseen() {
        match stored_value() {
            Some(stored) if stored != incoming_value => Acceptance::Conflict,
            _ => Acceptance::Stale,
        }
    } else {
        Acceptance::Stale
    }
}
