use crate::replica::{Version, VersionedValue};
use std::io;

#[derive(Debug)]
pub struct PutInput {
    pub key: String,
    pub value: String,
}

#[derive(Debug)]
pub struct PutOutput {
    /// Version the write was accepted at.
    pub version: Version,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error("Key is not usable: {0:?}")]
    InvalidKey(String),
    #[error("Failed to persist value locally")]
    LocalIoError(#[source] io::Error),
    #[error("Key {0:?} is already at the highest version")]
    VersionExhausted(String),
    #[error("Replica actor is dead RIP")]
    ActorExited,
}

#[derive(Debug)]
pub struct GetInput {
    pub key: String,
}

/// Result of a quorum read.
#[derive(Debug)]
pub struct GetOutput {
    pub value: String,
    pub version: Version,
    /// Number of responses (including our own copy) that backed `value` at `version`.
    pub votes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("Key is not usable: {0:?}")]
    InvalidKey(String),
    // Could be that nobody has the key, or every replica is unreachable. We can't tell.
    #[error("No replica responded to the quorum read before it timed out")]
    NoResponses,
    #[error("Replica actor is dead RIP")]
    ActorExited,
}

#[derive(Debug)]
pub struct DeleteInput {
    pub key: String,
}

#[derive(Debug)]
pub struct DeleteOutput {
    // Nothing
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("Delete is not supported")]
    Unimplemented,
    #[error("Replica actor is dead RIP")]
    ActorExited,
}

#[derive(Debug)]
pub struct LocalEntryInput {
    pub key: String,
}

/// This replica's own copy of a key, without asking anyone else. `None` if we've never accepted a
/// value for the key.
#[derive(Debug)]
pub struct LocalEntryOutput {
    pub entry: Option<VersionedValue>,
}

#[derive(Debug, thiserror::Error)]
pub enum LocalEntryError {
    #[error("Key is not usable: {0:?}")]
    InvalidKey(String),
    #[error("Failed to read value from local storage")]
    LocalIoError(#[source] io::Error),
    #[error("Replica actor is dead RIP")]
    ActorExited,
}

/// RumorTimerTick is a single tick of one rumor's resend timer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RumorTimerTick {
    pub(crate) key: String,
    pub(crate) session_id: u64,
}

/// QuorumTimerTick fires once, when the quorum read's collection window closes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuorumTimerTick {
    pub(crate) key: String,
    pub(crate) coordinator_id: u64,
}
