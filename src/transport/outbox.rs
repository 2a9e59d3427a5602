use crate::wire;
use crate::wire::Message;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::time::DelayQueue;

/// A message the replica wants delivered, and where.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutboundDatagram {
    pub(crate) to: SocketAddr,
    pub(crate) message: Message,
}

/// Outbox is the replica's non-blocking send path. Enqueueing never waits and never fails from the
/// replica's point of view; delivery problems are the outbox task's to deal with.
#[derive(Clone)]
pub(crate) struct Outbox {
    sender: mpsc::UnboundedSender<OutboundDatagram>,
}

impl Outbox {
    pub(crate) fn send(&self, to: SocketAddr, message: Message) {
        // Only fails if the outbox task is gone, which only happens during teardown.
        let _ = self.sender.send(OutboundDatagram { to, message });
    }
}

pub(crate) fn channel() -> (Outbox, mpsc::UnboundedReceiver<OutboundDatagram>) {
    let (tx, rx) = mpsc::unbounded_channel();

    (Outbox { sender: tx }, rx)
}

/// How failed sends are retried: exponential backoff starting at `initial_backoff`, capped at
/// `max_backoff`, giving up after `max_attempts` total attempts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) initial_backoff: Duration,
    pub(crate) max_backoff: Duration,
    pub(crate) max_attempts: u32,
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many attempts already failed. None means give up.
    pub(crate) fn backoff(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(failed_attempts - 1);
        Some(std::cmp::min(self.initial_backoff.saturating_mul(factor), self.max_backoff))
    }
}

struct PendingRetry {
    to: SocketAddr,
    bytes: Bytes,
    failed_attempts: u32,
}

/// OutboxTask encodes and sends everything the replica enqueues. Failed sends are parked on a
/// delay queue instead of being retried inline, so one unreachable peer never holds up the rest.
pub(crate) struct OutboxTask {
    logger: slog::Logger,
    socket: Arc<UdpSocket>,
    receiver: mpsc::UnboundedReceiver<OutboundDatagram>,
    retry_policy: RetryPolicy,
}

impl OutboxTask {
    pub(crate) fn new(
        logger: slog::Logger,
        socket: Arc<UdpSocket>,
        receiver: mpsc::UnboundedReceiver<OutboundDatagram>,
        retry_policy: RetryPolicy,
    ) -> Self {
        OutboxTask {
            logger,
            socket,
            receiver,
            retry_policy,
        }
    }

    /// Runs until every `Outbox` is dropped and all pending retries are resolved.
    pub(crate) async fn run(self) {
        let OutboxTask {
            logger,
            socket,
            mut receiver,
            retry_policy,
        } = self;
        let mut retries: DelayQueue<PendingRetry> = DelayQueue::new();
        let mut receiver_open = true;

        loop {
            tokio::select! {
                outbound = receiver.recv(), if receiver_open => match outbound {
                    Some(OutboundDatagram { to, message }) => {
                        let bytes = match wire::encode(&message) {
                            Ok(bytes) => Bytes::from(bytes),
                            Err(e) => {
                                slog::error!(logger, "Failed to encode {:?}: {:?}", message, e);
                                continue;
                            }
                        };
                        let attempt = PendingRetry { to, bytes, failed_attempts: 0 };
                        try_send(&logger, &socket, &retry_policy, &mut retries, attempt).await;
                    }
                    None => receiver_open = false,
                },
                Some(expired) = std::future::poll_fn(|cx| retries.poll_expired(cx)) => {
                    try_send(&logger, &socket, &retry_policy, &mut retries, expired.into_inner()).await;
                }
                else => break,
            }
        }
    }
}

async fn try_send(
    logger: &slog::Logger,
    socket: &UdpSocket,
    retry_policy: &RetryPolicy,
    retries: &mut DelayQueue<PendingRetry>,
    mut attempt: PendingRetry,
) {
    let error = match socket.send_to(&attempt.bytes, attempt.to).await {
        Ok(_) => return,
        Err(e) => e,
    };

    attempt.failed_attempts += 1;
    match retry_policy.backoff(attempt.failed_attempts) {
        Some(delay) => {
            slog::debug!(
                logger,
                "Send to {} failed ({:?}), retry #{} in {:?}",
                attempt.to,
                error,
                attempt.failed_attempts,
                delay
            );
            retries.insert(attempt, delay);
        }
        None => {
            slog::warn!(
                logger,
                "Dropping datagram to {} after {} failed attempts. Last error: {:?}",
                attempt.to,
                attempt.failed_attempts,
                error
            );
        }
    }
}
