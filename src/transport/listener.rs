use crate::actor::WeakActorClient;
use crate::transport::ListenerShutdownSignal;
use crate::wire;
use crate::wire::InboundMessage;
use std::sync::Arc;
use tokio::net::UdpSocket;

// Anti-entropy states are the biggest thing we receive, and must fit in one datagram.
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Listener receives datagrams, decodes them, and posts them into the replica's event queue.
pub(crate) struct Listener {
    logger: slog::Logger,
    socket: Arc<UdpSocket>,
    actor_client: WeakActorClient,
}

impl Listener {
    pub(crate) fn new(logger: slog::Logger, socket: Arc<UdpSocket>, actor_client: WeakActorClient) -> Self {
        Listener {
            logger,
            socket,
            actor_client,
        }
    }

    pub(crate) async fn run(self, mut shutdown: ListenerShutdownSignal) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    slog::info!(self.logger, "Listener shutting down");
                    return;
                }
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        let message = match wire::decode(&buf[..len]) {
                            Ok(message) => message,
                            Err(e) => {
                                slog::debug!(self.logger, "Dropping datagram from {}: {}", from, e);
                                continue;
                            }
                        };
                        if self.actor_client.inbound(InboundMessage { from, message }).await.is_err() {
                            slog::info!(self.logger, "Replica is gone. Listener exiting.");
                            return;
                        }
                    }
                    Err(e) => {
                        // E.g. ICMP port unreachable from a previous send. Not fatal.
                        slog::warn!(self.logger, "Failed to receive datagram: {:?}", e);
                    }
                },
            }
        }
    }
}
