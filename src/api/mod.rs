//! This mod holds the library's client-facing API.
mod client;
mod options;
mod wiring;

pub use client::GossipClient;
pub use options::GossipOptions;
pub use wiring::try_create_gossip_client;
pub use wiring::GossipClientConfig;
pub use wiring::GossipClientCreationError;
pub use wiring::StorageConfig;
