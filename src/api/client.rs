use crate::actor::ActorClient;
use crate::replica::{
    DeleteError, DeleteInput, GetError, GetInput, GetOutput, LocalEntryError, LocalEntryInput, PutError, PutInput,
    Version, VersionedValue,
};
use std::net::SocketAddr;

/// GossipClient is the application's handle to its local replica. Clones share the same replica,
/// which shuts down once every clone is dropped.
#[derive(Clone)]
pub struct GossipClient {
    pub(super) actor_client: ActorClient,
    pub(super) local_addr: SocketAddr,
}

impl GossipClient {
    /// Writes locally at the next version and starts spreading it. Returns the version written.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<Version, PutError> {
        let input = PutInput {
            key: key.into(),
            value: value.into(),
        };

        self.actor_client.put(input).await.map(|output| output.version)
    }

    /// Quorum read. Resolves once the read's collection window closes, not before.
    pub async fn get(&self, key: impl Into<String>) -> Result<GetOutput, GetError> {
        self.actor_client.get(GetInput { key: key.into() }).await
    }

    /// Always fails with `DeleteError::Unimplemented`.
    pub async fn delete(&self, key: impl Into<String>) -> Result<(), DeleteError> {
        self.actor_client.delete(DeleteInput { key: key.into() }).await.map(|_| ())
    }

    /// This replica's own copy, without asking peers.
    pub async fn local_entry(&self, key: impl Into<String>) -> Result<Option<VersionedValue>, LocalEntryError> {
        self.actor_client
            .local_entry(LocalEntryInput { key: key.into() })
            .await
            .map(|output| output.entry)
    }

    /// Address peers reach this replica at.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
