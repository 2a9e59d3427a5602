use crate::actor::{ActorClient, ReplicaActor};
use crate::api::client::GossipClient;
use crate::api::options::{GossipOptions, GossipOptionsValidated};
use crate::replica::{Neighbors, Replica, ReplicaConfig};
use crate::storage::{FileStorage, InMemoryStorage, Storage};
use crate::transport;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::convert::TryFrom;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UdpSocket;

const ACTOR_QUEUE_SIZE: usize = 64;

pub struct GossipClientConfig {
    /// Local UDP address to listen on. Port 0 picks any free port.
    pub bind_addr: SocketAddr,
    /// Address peers should use to reach us, if it differs from the bound address (e.g. when
    /// binding 0.0.0.0).
    pub advertised_addr: Option<SocketAddr>,
    pub neighbors: Vec<SocketAddr>,
    pub storage: StorageConfig,
    pub info_logger: slog::Logger,
    pub options: GossipOptions,
    /// Seeds every random choice the replica makes. Leave as `None` outside of tests.
    pub rng_seed: Option<u64>,
}

pub enum StorageConfig {
    /// Values live only as long as the process.
    InMemory,
    /// One file per key in this directory. Created if missing.
    Directory(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum GossipClientCreationError {
    #[error("Illegal options for configuring client: {0}")]
    IllegalClientOptions(String),
    #[error("Failed to open local storage")]
    StorageInitialization(#[source] io::Error),
    #[error("Failed to bind UDP socket")]
    Bind(#[source] io::Error),
    #[error("Peers can't reach us at {0}. Set an advertised address.")]
    UnreachableAddress(SocketAddr),
}

pub async fn try_create_gossip_client(config: GossipClientConfig) -> Result<GossipClient, GossipClientCreationError> {
    let options = GossipOptionsValidated::try_from(config.options)
        .map_err(|e| GossipClientCreationError::IllegalClientOptions(e.to_string()))?;

    let socket = UdpSocket::bind(config.bind_addr)
        .await
        .map_err(GossipClientCreationError::Bind)?;
    let bound_addr = socket.local_addr().map_err(GossipClientCreationError::Bind)?;
    let my_addr = config.advertised_addr.unwrap_or(bound_addr);
    if my_addr.ip().is_unspecified() {
        return Err(GossipClientCreationError::UnreachableAddress(my_addr));
    }

    let logger = config.info_logger.new(slog::o!("Replica" => my_addr.to_string()));
    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let wiring = ReplicaWiring {
        logger,
        socket: Arc::new(socket),
        my_addr,
        neighbors: Neighbors::new(my_addr, config.neighbors),
        options,
        rng,
    };

    let actor_client = match config.storage {
        StorageConfig::InMemory => wiring.spawn(InMemoryStorage::new()),
        StorageConfig::Directory(directory) => {
            let storage = FileStorage::open(directory).map_err(GossipClientCreationError::StorageInitialization)?;
            wiring.spawn(storage)
        }
    };

    Ok(GossipClient {
        actor_client,
        local_addr: my_addr,
    })
}

struct ReplicaWiring {
    logger: slog::Logger,
    socket: Arc<UdpSocket>,
    my_addr: SocketAddr,
    neighbors: Neighbors,
    options: GossipOptionsValidated,
    rng: StdRng,
}

impl ReplicaWiring {
    fn spawn<S: Storage + Send + 'static>(self, storage: S) -> ActorClient {
        slog::info!(
            self.logger,
            "Starting replica with {} neighbors: {:?}",
            self.neighbors.len(),
            self.neighbors.all()
        );

        let (actor_client, actor_queue_rx) = ActorClient::new(ACTOR_QUEUE_SIZE);
        let (outbox, outbox_rx) = transport::outbox_channel();
        let (listener_shutdown_handle, listener_shutdown_signal) = transport::shutdown_signal();

        let replica = Replica::new(ReplicaConfig {
            logger: self.logger.clone(),
            my_addr: self.my_addr,
            neighbors: self.neighbors,
            storage,
            outbox,
            actor_client: actor_client.weak(),
            listener_shutdown_handle,
            options: self.options.replica_options(),
            rng: self.rng,
        });

        let replica_actor = ReplicaActor::new(self.logger.clone(), actor_queue_rx, replica);
        tokio::spawn(replica_actor.run_event_loop());

        let listener = transport::Listener::new(self.logger.clone(), self.socket.clone(), actor_client.weak());
        tokio::spawn(listener.run(listener_shutdown_signal));

        let outbox_task = transport::OutboxTask::new(self.logger, self.socket, outbox_rx, self.options.retry_policy());
        tokio::spawn(outbox_task.run());

        actor_client
    }
}
