// Only `mod` and `use` in here. Everything the rest of the crate needs is re-exported below.
mod acceptance;
mod anti_entropy;
mod neighbors;
mod quorum;
mod replica;
mod replica_api;
mod rumor;
mod timers;
mod version;
mod versioned_store;

pub use neighbors::Neighbors;
pub use replica_api::DeleteError;
pub use replica_api::DeleteInput;
pub use replica_api::DeleteOutput;
pub use replica_api::GetError;
pub use replica_api::GetInput;
pub use replica_api::GetOutput;
pub use replica_api::LocalEntryError;
pub use replica_api::LocalEntryInput;
pub use replica_api::LocalEntryOutput;
pub use replica_api::PutError;
pub use replica_api::PutInput;
pub use replica_api::PutOutput;
pub use version::Version;
pub use version::VersionedValue;

pub(crate) use replica::Replica;
pub(crate) use replica::ReplicaConfig;
pub(crate) use replica::ReplicaOptions;
pub(crate) use replica_api::QuorumTimerTick;
pub(crate) use replica_api::RumorTimerTick;
