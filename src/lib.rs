// `crate::{root_mod}` holds no code. Just `mod` and `pub use` statements.
mod actor;
mod api;
mod replica;
mod storage;
mod transport;
mod wire;
mod proto {
    include!("../generated/gossip.rs");
}

pub use api::try_create_gossip_client;
pub use api::GossipClient;
pub use api::GossipClientConfig;
pub use api::GossipClientCreationError;
pub use api::GossipOptions;
pub use api::StorageConfig;
pub use replica::DeleteError;
pub use replica::GetError;
pub use replica::GetOutput;
pub use replica::LocalEntryError;
pub use replica::PutError;
pub use replica::Version;
pub use replica::VersionedValue;
