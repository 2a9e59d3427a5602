use crate::replica;
use crate::storage::Storage;
use crate::wire::InboundMessage;
use std::error::Error;
use std::fmt::Debug;
use tokio::sync::{mpsc, oneshot};

/// Everything that can happen to a replica. All of it is handled one at a time by `ReplicaActor`.
#[derive(Debug)]
pub(crate) enum Event {
    // Bump version, persist, start a rumor.
    LocalPut(
        replica::PutInput,
        Callback<replica::PutOutput, replica::PutError>,
    ),

    // Start a quorum read. Callback is completed when the read's timer fires.
    LocalGet(
        replica::GetInput,
        Callback<replica::GetOutput, replica::GetError>,
    ),

    LocalDelete(
        replica::DeleteInput,
        Callback<replica::DeleteOutput, replica::DeleteError>,
    ),

    // Read our own copy. No network.
    LocalEntry(
        replica::LocalEntryInput,
        Callback<replica::LocalEntryOutput, replica::LocalEntryError>,
    ),

    // A decoded datagram from a peer.
    Inbound(InboundMessage),

    RumorTimeout(replica::RumorTimerTick),
    QuorumTimeout(replica::QuorumTimerTick),
    AntiEntropyTimer,
}

#[derive(Debug)]
pub(crate) struct Callback<O: Debug, E: Error>(pub(crate) oneshot::Sender<Result<O, E>>);

impl<O: Debug, E: Error> Callback<O, E> {
    pub(crate) fn send(self, message: Result<O, E>) {
        // Caller may have given up waiting.
        let _ = self.0.send(message);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Replica actor exited")]
pub(crate) struct ActorExited;

/// ActorClient is the strong handle to a replica's event queue. The actor keeps running for as
/// long as at least one ActorClient is alive.
#[derive(Clone)]
pub(crate) struct ActorClient {
    sender: mpsc::Sender<Event>,
}

impl ActorClient {
    pub(crate) fn new(buffer_size: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer_size);

        (ActorClient { sender: tx }, rx)
    }

    pub(crate) fn weak(&self) -> WeakActorClient {
        WeakActorClient {
            sender: self.sender.downgrade(),
        }
    }

    pub(crate) async fn put(&self, input: replica::PutInput) -> Result<replica::PutOutput, replica::PutError> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::LocalPut(input, Callback(tx)))
            .await
            .map_err(|_| replica::PutError::ActorExited)?;

        rx.await.map_err(|_| replica::PutError::ActorExited)?
    }

    pub(crate) async fn get(&self, input: replica::GetInput) -> Result<replica::GetOutput, replica::GetError> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::LocalGet(input, Callback(tx)))
            .await
            .map_err(|_| replica::GetError::ActorExited)?;

        rx.await.map_err(|_| replica::GetError::ActorExited)?
    }

    pub(crate) async fn delete(
        &self,
        input: replica::DeleteInput,
    ) -> Result<replica::DeleteOutput, replica::DeleteError> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::LocalDelete(input, Callback(tx)))
            .await
            .map_err(|_| replica::DeleteError::ActorExited)?;

        rx.await.map_err(|_| replica::DeleteError::ActorExited)?
    }

    pub(crate) async fn local_entry(
        &self,
        input: replica::LocalEntryInput,
    ) -> Result<replica::LocalEntryOutput, replica::LocalEntryError> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::LocalEntry(input, Callback(tx)))
            .await
            .map_err(|_| replica::LocalEntryError::ActorExited)?;

        rx.await.map_err(|_| replica::LocalEntryError::ActorExited)?
    }

    async fn send(&self, event: Event) -> Result<(), ActorExited> {
        self.sender.send(event).await.map_err(|_| ActorExited)
    }
}

/// WeakActorClient is held by everything the replica owns (timers, listener), so that those don't
/// keep the actor alive after the user drops the last `ActorClient`.
#[derive(Clone)]
pub(crate) struct WeakActorClient {
    sender: mpsc::WeakSender<Event>,
}

impl WeakActorClient {
    pub(crate) async fn inbound(&self, message: InboundMessage) -> Result<(), ActorExited> {
        self.send(Event::Inbound(message)).await
    }

    pub(crate) async fn rumor_timeout(&self, tick: replica::RumorTimerTick) -> Result<(), ActorExited> {
        self.send(Event::RumorTimeout(tick)).await
    }

    pub(crate) async fn quorum_timeout(&self, tick: replica::QuorumTimerTick) -> Result<(), ActorExited> {
        self.send(Event::QuorumTimeout(tick)).await
    }

    pub(crate) async fn anti_entropy_timer(&self) -> Result<(), ActorExited> {
        self.send(Event::AntiEntropyTimer).await
    }

    async fn send(&self, event: Event) -> Result<(), ActorExited> {
        let sender = self.sender.upgrade().ok_or(ActorExited)?;
        sender.send(event).await.map_err(|_| ActorExited)
    }
}

/// ReplicaActor is replica logic in actor model.
pub(crate) struct ReplicaActor<S: Storage> {
    logger: slog::Logger,
    receiver: mpsc::Receiver<Event>,
    replica: replica::Replica<S>,
}

impl<S: Storage> ReplicaActor<S> {
    pub(crate) fn new(logger: slog::Logger, receiver: mpsc::Receiver<Event>, replica: replica::Replica<S>) -> Self {
        ReplicaActor {
            logger,
            receiver,
            replica,
        }
    }

    pub(crate) async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event);
        }
        slog::info!(self.logger, "All clients dropped. Replica event loop exiting.");
    }

    // This must NOT be async. Sends are handed to the outbox and timers run as their own tasks.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::LocalPut(input, callback) => {
                let result = self.replica.handle_local_put(input);
                callback.send(result);
            }
            Event::LocalGet(input, callback) => {
                // Answered later, when the quorum timer fires.
                self.replica.handle_local_get(input, callback);
            }
            Event::LocalDelete(input, callback) => {
                let result = self.replica.handle_local_delete(input);
                callback.send(result);
            }
            Event::LocalEntry(input, callback) => {
                let result = self.replica.handle_local_entry(input);
                callback.send(result);
            }
            Event::Inbound(message) => {
                self.replica.handle_inbound(message);
            }
            Event::RumorTimeout(tick) => {
                self.replica.handle_rumor_timeout(tick);
            }
            Event::QuorumTimeout(tick) => {
                self.replica.handle_quorum_timeout(tick);
            }
            Event::AntiEntropyTimer => {
                self.replica.handle_anti_entropy_timer();
            }
        }
    }
}
