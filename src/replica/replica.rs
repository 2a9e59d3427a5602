use crate::actor::{Callback, WeakActorClient};
use crate::replica::acceptance::{self, Acceptance};
use crate::replica::anti_entropy;
use crate::replica::neighbors::Neighbors;
use crate::replica::quorum::{QuorumCoordinator, QuorumVote};
use crate::replica::replica_api::{
    DeleteError, DeleteInput, DeleteOutput, GetError, GetInput, GetOutput, LocalEntryError, LocalEntryInput,
    LocalEntryOutput, PutError, PutInput, PutOutput, QuorumTimerTick, RumorTimerTick,
};
use crate::replica::rumor::{RumorDecision, RumorSession};
use crate::replica::timers::{AntiEntropyTimerHandle, QuorumTimerHandle, RumorTimerHandle};
use crate::replica::version::{Version, VersionedValue};
use crate::replica::versioned_store::VersionedStore;
use crate::storage::Storage;
use crate::transport::{ListenerShutdownHandle, Outbox};
use crate::wire::{
    AckMessage, FinalMessage, InboundMessage, Message, ProbeMessage, QuorumCallMessage, QuorumResponseMessage,
    ReplyMessage, RumorMessage,
};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ReplicaOptions {
    pub(crate) rumor_timeout: Duration,
    pub(crate) rumor_stop_denominator: u32,
    pub(crate) anti_entropy_min_interval: Duration,
    pub(crate) anti_entropy_max_interval: Duration,
    pub(crate) quorum_timeout: Duration,
}

pub(crate) struct ReplicaConfig<S: Storage> {
    pub(crate) logger: slog::Logger,
    pub(crate) my_addr: SocketAddr,
    pub(crate) neighbors: Neighbors,
    pub(crate) storage: S,
    pub(crate) outbox: Outbox,
    pub(crate) actor_client: WeakActorClient,
    pub(crate) listener_shutdown_handle: ListenerShutdownHandle,
    pub(crate) options: ReplicaOptions,
    pub(crate) rng: StdRng,
}

struct LiveRumor {
    session: RumorSession,
    _timer: RumorTimerHandle,
}

struct LiveQuorum {
    coordinator: QuorumCoordinator,
    callback: Callback<GetOutput, GetError>,
    _timer: QuorumTimerHandle,
}

/// Replica is the protocol engine of one peer. It owns the version bookkeeping and every live
/// session, and reacts to one event at a time: local requests, datagrams from peers, and timer
/// ticks. It never blocks; outbound datagrams go to the outbox.
pub(crate) struct Replica<S: Storage> {
    logger: slog::Logger,
    my_addr: SocketAddr,
    neighbors: Neighbors,
    storage: S,
    versions: VersionedStore,
    rumors: HashMap<String, LiveRumor>,
    // Keyed by coordinator id. Reads of the same key may overlap.
    quorums: HashMap<u64, LiveQuorum>,
    outbox: Outbox,
    actor_client: WeakActorClient,
    options: ReplicaOptions,
    rng: StdRng,
    next_session_id: u64,
    _anti_entropy_timer: AntiEntropyTimerHandle,
    _listener_shutdown_handle: ListenerShutdownHandle,
}

impl<S: Storage> Replica<S> {
    pub(crate) fn new(config: ReplicaConfig<S>) -> Self {
        let anti_entropy_timer = AntiEntropyTimerHandle::spawn_timer_task(
            config.options.anti_entropy_min_interval,
            config.options.anti_entropy_max_interval,
            config.actor_client.clone(),
        );

        Replica {
            logger: config.logger,
            my_addr: config.my_addr,
            neighbors: config.neighbors,
            storage: config.storage,
            versions: VersionedStore::new(),
            rumors: HashMap::new(),
            quorums: HashMap::new(),
            outbox: config.outbox,
            actor_client: config.actor_client,
            options: config.options,
            rng: config.rng,
            next_session_id: 0,
            _anti_entropy_timer: anti_entropy_timer,
            _listener_shutdown_handle: config.listener_shutdown_handle,
        }
    }

    pub(crate) fn handle_local_put(&mut self, input: PutInput) -> Result<PutOutput, PutError> {
        if input.key.is_empty() {
            return Err(PutError::InvalidKey(input.key));
        }

        let version = match self.versions.version_of(&input.key).next() {
            Some(version) => version,
            None => return Err(PutError::VersionExhausted(input.key)),
        };
        self.storage
            .put(&input.key, &input.value)
            .map_err(PutError::LocalIoError)?;
        self.versions.record(&input.key, version);
        slog::info!(self.logger, "Local write {:?}={:?} at {:?}", input.key, input.value, version);

        self.start_rumor(input.key, version, input.value);

        Ok(PutOutput { version })
    }

    pub(crate) fn handle_local_get(&mut self, input: GetInput, callback: Callback<GetOutput, GetError>) {
        if input.key.is_empty() {
            callback.send(Err(GetError::InvalidKey(input.key)));
            return;
        }

        let key = input.key;
        let local_version = self.versions.version_of(&key);
        let mut coordinator = QuorumCoordinator::new(self.next_session_id(), key.clone(), local_version);
        if let Some(entry) = self.local_entry(&key) {
            coordinator.record_local(QuorumVote::new(entry.value, entry.version));
        }

        let call = QuorumCallMessage {
            key: key.clone(),
            version: coordinator.local_version(),
        };
        for peer in self.neighbors.all() {
            self.outbox.send(*peer, Message::QuorumCall(call.clone()));
        }

        let timer = QuorumTimerHandle::spawn_timer_task(
            self.options.quorum_timeout,
            self.actor_client.clone(),
            QuorumTimerTick {
                key: key.clone(),
                coordinator_id: coordinator.id(),
            },
        );
        slog::debug!(
            self.logger,
            "Quorum read for {:?} started at local {:?}",
            coordinator.key(),
            local_version
        );

        self.quorums.insert(
            coordinator.id(),
            LiveQuorum {
                coordinator,
                callback,
                _timer: timer,
            },
        );
    }

    pub(crate) fn handle_local_delete(&mut self, input: DeleteInput) -> Result<DeleteOutput, DeleteError> {
        slog::info!(self.logger, "Rejecting delete of {:?}. Deletes are not supported.", input.key);
        Err(DeleteError::Unimplemented)
    }

    pub(crate) fn handle_local_entry(&self, input: LocalEntryInput) -> Result<LocalEntryOutput, LocalEntryError> {
        if input.key.is_empty() {
            return Err(LocalEntryError::InvalidKey(input.key));
        }

        let version = self.versions.version_of(&input.key);
        if version.is_unseen() {
            return Ok(LocalEntryOutput { entry: None });
        }

        let entry = self
            .storage
            .get(&input.key)
            .map_err(LocalEntryError::LocalIoError)?
            .map(|value| VersionedValue { version, value });

        Ok(LocalEntryOutput { entry })
    }

    pub(crate) fn handle_inbound(&mut self, inbound: InboundMessage) {
        let from = inbound.from;
        match inbound.message {
            Message::Rumor(rumor) => self.handle_rumor(rumor),
            Message::Ack(ack) => self.handle_ack(ack),
            Message::AntiEntropyProbe(probe) => self.handle_probe(probe),
            Message::AntiEntropyReply(reply) => self.handle_reply(from, reply),
            Message::AntiEntropyFinal(final_message) => self.handle_final(final_message),
            Message::QuorumCall(call) => self.handle_quorum_call(from, call),
            Message::QuorumResponse(response) => self.handle_quorum_response(from, response),
        }
    }

    fn handle_rumor(&mut self, rumor: RumorMessage) {
        let acceptance = match self.accept_update(&rumor.key, &rumor.value, rumor.version) {
            Ok(acceptance) => acceptance,
            Err(e) => {
                // No ack. The forwarder will treat it as silence and keep pushing.
                slog::warn!(self.logger, "Failed to store rumor for {:?}: {:?}", rumor.key, e);
                return;
            }
        };

        let accepted = acceptance == Acceptance::Accepted;
        self.outbox.send(
            rumor.return_addr,
            Message::Ack(AckMessage {
                accepted,
                key: rumor.key.clone(),
                version: rumor.version,
            }),
        );

        if accepted {
            self.start_rumor(rumor.key, rumor.version, rumor.value);
        }
    }

    fn handle_ack(&mut self, ack: AckMessage) {
        match self.rumors.get_mut(&ack.key) {
            Some(live) => {
                let key = ack.key.clone();
                let version = ack.version;
                if !live.session.on_ack(ack) {
                    slog::debug!(self.logger, "Ignoring ack for {:?} at {:?}. Rumor moved on.", key, version);
                }
            }
            None => {
                slog::debug!(self.logger, "Ignoring ack for {:?}. No live rumor.", ack.key);
            }
        }
    }

    pub(crate) fn handle_rumor_timeout(&mut self, tick: RumorTimerTick) {
        let live = match self.rumors.get_mut(&tick.key) {
            Some(live) if live.session.id() == tick.session_id => live,
            _ => {
                // Timer of a session that was since replaced or terminated.
                return;
            }
        };

        match live.session.on_timeout(&mut self.rng, self.options.rumor_stop_denominator) {
            RumorDecision::Resend => {
                let key = live.session.key().to_string();
                let value = live.session.value().to_string();
                let version = live.session.version();
                self.send_rumor(key, version, value);
            }
            RumorDecision::Terminate => {
                slog::debug!(
                    self.logger,
                    "Rumor for {:?} at {:?} died out",
                    tick.key,
                    live.session.version()
                );
                self.rumors.remove(&tick.key);
            }
        }
    }

    pub(crate) fn handle_anti_entropy_timer(&mut self) {
        let peer = match self.neighbors.random(&mut self.rng) {
            Some(peer) => peer,
            None => return,
        };

        let state = self.versions.snapshot();
        slog::debug!(self.logger, "Anti-entropy probe to {} with {} keys", peer, state.len());
        self.outbox.send(
            peer,
            Message::AntiEntropyProbe(ProbeMessage {
                state,
                return_addr: self.my_addr,
            }),
        );
    }

    fn handle_probe(&mut self, probe: ProbeMessage) {
        let my_state = self.versions.snapshot();
        let diff = anti_entropy::reconcile(&probe.state, &my_state);
        let offered = anti_entropy::collect_updates(&diff.offered, &probe.state, |key| self.local_entry(key));

        slog::debug!(
            self.logger,
            "Anti-entropy with {}: need {} keys, offer {} keys",
            probe.return_addr,
            diff.needed.len(),
            offered.len()
        );
        self.outbox.send(
            probe.return_addr,
            Message::AntiEntropyReply(ReplyMessage {
                state: my_state,
                needed: diff.needed,
                offered,
            }),
        );
    }

    fn handle_reply(&mut self, from: SocketAddr, reply: ReplyMessage) {
        for (key, entry) in reply.offered {
            self.apply_anti_entropy_update(&key, entry);
        }

        let updates = anti_entropy::collect_updates(&reply.needed, &reply.state, |key| self.local_entry(key));
        if updates.is_empty() {
            return;
        }
        slog::debug!(self.logger, "Anti-entropy final to {} with {} keys", from, updates.len());
        self.outbox
            .send(from, Message::AntiEntropyFinal(FinalMessage { updates }));
    }

    fn handle_final(&mut self, final_message: FinalMessage) {
        for (key, entry) in final_message.updates {
            self.apply_anti_entropy_update(&key, entry);
        }
    }

    fn handle_quorum_call(&mut self, from: SocketAddr, call: QuorumCallMessage) {
        let version = self.versions.version_of(&call.key);
        // Only peers that are at least as up to date as the caller get a say.
        if version.is_unseen() || version < call.version {
            return;
        }

        match self.storage.get(&call.key) {
            Ok(Some(value)) => self.outbox.send(
                from,
                Message::QuorumResponse(QuorumResponseMessage {
                    key: call.key,
                    value,
                    version,
                }),
            ),
            Ok(None) => {}
            Err(e) => {
                slog::warn!(self.logger, "Failed to read {:?} for quorum call: {:?}", call.key, e);
            }
        }
    }

    fn handle_quorum_response(&mut self, from: SocketAddr, response: QuorumResponseMessage) {
        // Responses don't name a read, so every open read of the key counts them.
        let QuorumResponseMessage { key, value, version } = response;
        let vote = QuorumVote::new(value, version);
        let mut open_reads = 0;
        for live in self.quorums.values_mut().filter(|live| live.coordinator.key() == key) {
            open_reads += 1;
            if !live.coordinator.record_response(from, vote.clone()) {
                slog::debug!(
                    self.logger,
                    "Duplicate quorum response from {} for read {}",
                    from,
                    live.coordinator.id()
                );
            }
        }

        if open_reads == 0 {
            slog::debug!(self.logger, "Late quorum response from {} for {:?}", from, key);
        }
    }

    pub(crate) fn handle_quorum_timeout(&mut self, tick: QuorumTimerTick) {
        let live = match self.quorums.remove(&tick.coordinator_id) {
            Some(live) => live,
            None => return,
        };

        let decision = live.coordinator.decide();
        slog::info!(
            self.logger,
            "Quorum read for {:?} decided {:?} from {} responses",
            tick.key,
            decision,
            live.coordinator.num_responses()
        );

        let result = match decision {
            Some(decision) => Ok(GetOutput {
                value: decision.value,
                version: decision.version,
                votes: decision.votes,
            }),
            None => Err(GetError::NoResponses),
        };
        live.callback.send(result);
    }

    /// The monotonic acceptance rule, and storing the update if it passes. Superseded rumors are
    /// torn down here; starting a new one is up to the caller.
    fn accept_update(&mut self, key: &str, value: &str, version: Version) -> Result<Acceptance, io::Error> {
        let storage = &self.storage;
        let current = self.versions.version_of(key);
        let acceptance = acceptance::judge(current, version, value, || storage.get(key).ok().flatten());

        match acceptance {
            Acceptance::Accepted => {
                self.storage.put(key, value)?;
                self.versions.record(key, version);

                let superseded = self
                    .rumors
                    .get(key)
                    .map_or(false, |live| live.session.version() < version);
                if superseded {
                    self.rumors.remove(key);
                }
            }
            Acceptance::Conflict => {
                slog::warn!(
                    self.logger,
                    "Conflicting value for {:?} at {:?}. Keeping ours, dropping {:?}.",
                    key,
                    version,
                    value
                );
            }
            Acceptance::Stale => {}
        }

        Ok(acceptance)
    }

    fn apply_anti_entropy_update(&mut self, key: &str, entry: VersionedValue) {
        match self.accept_update(key, &entry.value, entry.version) {
            Ok(Acceptance::Accepted) => {
                slog::debug!(self.logger, "Anti-entropy repaired {:?} to {:?}", key, entry.version);
            }
            Ok(_) => {}
            Err(e) => {
                slog::warn!(self.logger, "Failed to store anti-entropy update for {:?}: {:?}", key, e);
            }
        }
    }

    fn start_rumor(&mut self, key: String, version: Version, value: String) {
        // Nobody to tell.
        if self.neighbors.is_empty() {
            return;
        }

        let session_id = self.next_session_id();
        self.send_rumor(key.clone(), version, value.clone());

        let timer = RumorTimerHandle::spawn_timer_task(
            self.options.rumor_timeout,
            self.actor_client.clone(),
            RumorTimerTick {
                key: key.clone(),
                session_id,
            },
        );
        let session = RumorSession::start(session_id, key.clone(), version, value);

        // Replacing drops the old session's timer.
        self.rumors.insert(key, LiveRumor { session, _timer: timer });
    }

    fn send_rumor(&mut self, key: String, version: Version, value: String) {
        if let Some(peer) = self.neighbors.random(&mut self.rng) {
            self.outbox.send(
                peer,
                Message::Rumor(RumorMessage {
                    key,
                    value,
                    version,
                    return_addr: self.my_addr,
                }),
            );
        }
    }

    fn local_entry(&self, key: &str) -> Option<VersionedValue> {
        let version = self.versions.version_of(key);
        if version.is_unseen() {
            return None;
        }

        match self.storage.get(key) {
            Ok(value) => value.map(|value| VersionedValue { version, value }),
            Err(e) => {
                slog::warn!(self.logger, "Failed to read {:?} from storage: {:?}", key, e);
                None
            }
        }
    }

    fn next_session_id(&mut self) -> u64 {
        self.next_session_id += 1;
        self.next_session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorClient, Event};
    use crate::storage::InMemoryStorage;
    use crate::transport::{outbox_channel, shutdown_signal, OutboundDatagram};
    use rand::SeedableRng;
    use tokio::sync::{mpsc, oneshot};

    struct TestReplica {
        addr: SocketAddr,
        replica: Replica<InMemoryStorage>,
        outbox_rx: mpsc::UnboundedReceiver<OutboundDatagram>,
        _actor_client: ActorClient,
        _actor_rx: mpsc::Receiver<Event>,
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn options() -> ReplicaOptions {
        // Long timers: tests fire timeouts by hand.
        ReplicaOptions {
            rumor_timeout: Duration::from_secs(3600),
            rumor_stop_denominator: 2,
            anti_entropy_min_interval: Duration::from_secs(3600),
            anti_entropy_max_interval: Duration::from_secs(3600),
            quorum_timeout: Duration::from_secs(3600),
        }
    }

    fn create(port: u16, neighbor_ports: &[u16], options: ReplicaOptions) -> TestReplica {
        let my_addr = addr(port);
        let (actor_client, actor_rx) = ActorClient::new(10);
        let (outbox, outbox_rx) = outbox_channel();
        let (listener_shutdown_handle, _) = shutdown_signal();

        let replica = Replica::new(ReplicaConfig {
            logger: slog::Logger::root(slog::Discard, slog::o!()),
            my_addr,
            neighbors: Neighbors::new(my_addr, neighbor_ports.iter().map(|p| addr(*p)).collect()),
            storage: InMemoryStorage::new(),
            outbox,
            actor_client: actor_client.weak(),
            listener_shutdown_handle,
            options,
            rng: StdRng::seed_from_u64(u64::from(port)),
        });

        TestReplica {
            addr: my_addr,
            replica,
            outbox_rx,
            _actor_client: actor_client,
            _actor_rx: actor_rx,
        }
    }

    impl TestReplica {
        fn sent(&mut self) -> Vec<OutboundDatagram> {
            let mut sent = Vec::new();
            while let Ok(datagram) = self.outbox_rx.try_recv() {
                sent.push(datagram);
            }
            sent
        }

        fn receive(&mut self, from: SocketAddr, message: Message) {
            self.replica.handle_inbound(InboundMessage { from, message });
        }

        fn put(&mut self, key: &str, value: &str) -> Version {
            self.replica
                .handle_local_put(PutInput {
                    key: key.into(),
                    value: value.into(),
                })
                .unwrap()
                .version
        }

        fn entry(&self, key: &str) -> Option<VersionedValue> {
            self.replica
                .handle_local_entry(LocalEntryInput { key: key.into() })
                .unwrap()
                .entry
        }

        fn seed(&mut self, key: &str, value: &str, version: u64) {
            let acceptance = self.replica.accept_update(key, value, Version::new(version)).unwrap();
            assert_eq!(acceptance, Acceptance::Accepted);
        }

        fn start_get(&mut self, key: &str) -> oneshot::Receiver<Result<GetOutput, GetError>> {
            let (tx, rx) = oneshot::channel();
            self.replica.handle_local_get(GetInput { key: key.into() }, Callback(tx));
            rx
        }

        /// Closes every open read of `key`, oldest first.
        fn fire_quorum_timeouts(&mut self, key: &str) {
            let mut coordinator_ids: Vec<u64> = self
                .replica
                .quorums
                .values()
                .filter(|live| live.coordinator.key() == key)
                .map(|live| live.coordinator.id())
                .collect();
            coordinator_ids.sort_unstable();

            for coordinator_id in coordinator_ids {
                self.replica.handle_quorum_timeout(QuorumTimerTick {
                    key: key.into(),
                    coordinator_id,
                });
            }
        }

        fn fire_rumor_timeout(&mut self, key: &str) {
            let session_id = self.replica.rumors[key].session.id();
            self.replica.handle_rumor_timeout(RumorTimerTick {
                key: key.into(),
                session_id,
            });
        }
    }

    fn entry(value: &str, version: u64) -> Option<VersionedValue> {
        Some(VersionedValue {
            version: Version::new(version),
            value: value.into(),
        })
    }

    fn rumor(key: &str, value: &str, version: u64, return_addr: SocketAddr) -> Message {
        Message::Rumor(RumorMessage {
            key: key.into(),
            value: value.into(),
            version: Version::new(version),
            return_addr,
        })
    }

    fn ack(accepted: bool, key: &str, version: u64) -> Message {
        Message::Ack(AckMessage {
            accepted,
            key: key.into(),
            version: Version::new(version),
        })
    }

    #[tokio::test]
    async fn local_put_bumps_version_and_starts_rumor() {
        let mut r1 = create(1, &[2], options());

        assert_eq!(r1.put("k", "a"), Version::new(1));
        assert_eq!(r1.sent(), vec![OutboundDatagram {
            to: addr(2),
            message: rumor("k", "a", 1, addr(1)),
        }]);

        assert_eq!(r1.put("k", "b"), Version::new(2));
        assert_eq!(r1.entry("k"), entry("b", 2));

        // Newer write replaced the older rumor.
        assert_eq!(r1.replica.rumors.len(), 1);
        assert_eq!(r1.replica.rumors["k"].session.version(), Version::new(2));
    }

    #[tokio::test]
    async fn local_put_rejects_empty_key() {
        let mut r1 = create(1, &[2], options());

        let result = r1.replica.handle_local_put(PutInput {
            key: "".into(),
            value: "v".into(),
        });
        assert!(matches!(result, Err(PutError::InvalidKey(_))));
        assert!(r1.sent().is_empty());
    }

    #[tokio::test]
    async fn rumor_is_accepted_once_and_acked() {
        let mut r2 = create(2, &[1, 3], options());

        // -- first delivery: accepted, acked positively to the forwarder, pushed onward --
        r2.receive(addr(1), rumor("k", "v", 4, addr(1)));
        assert_eq!(r2.entry("k"), entry("v", 4));

        let sent = r2.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], OutboundDatagram {
            to: addr(1),
            message: ack(true, "k", 4),
        });
        match &sent[1].message {
            Message::Rumor(forwarded) => {
                assert_eq!(forwarded.version, Version::new(4));
                assert_eq!(forwarded.return_addr, addr(2));
            }
            other => panic!("Expected forwarded rumor, got {:?}", other),
        }

        // -- duplicate delivery: idempotent, negative ack, no new session --
        let session_id = r2.replica.rumors["k"].session.id();
        r2.receive(addr(3), rumor("k", "v", 4, addr(3)));

        assert_eq!(r2.entry("k"), entry("v", 4));
        assert_eq!(r2.sent(), vec![OutboundDatagram {
            to: addr(3),
            message: ack(false, "k", 4),
        }]);
        assert_eq!(r2.replica.rumors["k"].session.id(), session_id);
    }

    #[tokio::test]
    async fn stale_and_conflicting_rumors_are_not_applied() {
        let mut r2 = create(2, &[1], options());
        r2.seed("k", "ours", 5);

        r2.receive(addr(1), rumor("k", "older", 3, addr(1)));
        r2.receive(addr(1), rumor("k", "different", 5, addr(1)));

        assert_eq!(r2.entry("k"), entry("ours", 5));
        assert_eq!(r2.sent(), vec![
            OutboundDatagram {
                to: addr(1),
                message: ack(false, "k", 3),
            },
            OutboundDatagram {
                to: addr(1),
                message: ack(false, "k", 5),
            },
        ]);
    }

    #[tokio::test]
    async fn rumor_keeps_spreading_until_peer_already_knows() {
        // Denominator 1: the first negative ack always stops the rumor.
        let mut r1 = create(1, &[2], ReplicaOptions {
            rumor_stop_denominator: 1,
            ..options()
        });
        r1.put("k", "v");
        r1.sent();

        // Silence: resend.
        r1.fire_rumor_timeout("k");
        assert_eq!(r1.sent().len(), 1);

        // Positive ack: resend.
        r1.receive(addr(2), ack(true, "k", 1));
        r1.fire_rumor_timeout("k");
        assert_eq!(r1.sent().len(), 1);

        // Ack for another version is ignored, so this is silence again.
        r1.receive(addr(2), ack(false, "k", 7));
        r1.fire_rumor_timeout("k");
        assert_eq!(r1.sent().len(), 1);

        // Negative ack: terminated.
        r1.receive(addr(2), ack(false, "k", 1));
        r1.fire_rumor_timeout("k");
        assert!(r1.sent().is_empty());
        assert!(r1.replica.rumors.is_empty());
    }

    #[tokio::test]
    async fn stale_rumor_tick_is_ignored() {
        let mut r1 = create(1, &[2], options());
        r1.put("k", "v1");
        let old_session_id = r1.replica.rumors["k"].session.id();
        r1.put("k", "v2");
        r1.sent();

        r1.replica.handle_rumor_timeout(RumorTimerTick {
            key: "k".into(),
            session_id: old_session_id,
        });

        assert!(r1.sent().is_empty());
        assert_eq!(r1.replica.rumors["k"].session.version(), Version::new(2));
    }

    #[tokio::test]
    async fn anti_entropy_exchange_converges_both_sides() {
        let mut r1 = create(1, &[2], options());
        let mut r2 = create(2, &[1], options());
        r1.seed("k1", "one", 2);
        r1.seed("k2", "two-new", 5);
        r2.seed("k2", "two-old", 3);
        r2.seed("k3", "three", 1);

        // Phase 1: probe.
        r1.replica.handle_anti_entropy_timer();
        let probe = r1.sent().remove(0);
        assert_eq!(probe.to, r2.addr);
        r2.receive(r1.addr, probe.message);

        // Phase 1 response: reply carries what r2 needs and what it donates.
        let reply = r2.sent().remove(0);
        assert_eq!(reply.to, r1.addr);
        match &reply.message {
            Message::AntiEntropyReply(reply) => {
                assert_eq!(reply.needed.keys().collect::<Vec<_>>(), vec!["k1", "k2"]);
                assert_eq!(reply.offered.keys().collect::<Vec<_>>(), vec!["k3"]);
            }
            other => panic!("Expected reply, got {:?}", other),
        }
        r1.receive(r2.addr, reply.message);

        // Phase 2: final.
        let final_message = r1.sent().remove(0);
        assert_eq!(final_message.to, r2.addr);
        r2.receive(r1.addr, final_message.message);

        for replica in [&r1, &r2].iter() {
            assert_eq!(replica.entry("k1"), entry("one", 2));
            assert_eq!(replica.entry("k2"), entry("two-new", 5));
            assert_eq!(replica.entry("k3"), entry("three", 1));
        }

        // Anti-entropy repairs don't start rumors, and nothing else was sent.
        assert!(r1.replica.rumors.is_empty());
        assert!(r2.replica.rumors.is_empty());
        assert!(r1.sent().is_empty());
        assert!(r2.sent().is_empty());
    }

    #[tokio::test]
    async fn anti_entropy_tears_down_superseded_rumor() {
        let mut r1 = create(1, &[2], options());
        r1.put("k", "local");
        assert_eq!(r1.replica.rumors.len(), 1);

        r1.receive(
            addr(2),
            Message::AntiEntropyFinal(FinalMessage {
                updates: vec![(
                    "k".to_string(),
                    VersionedValue {
                        version: Version::new(3),
                        value: "remote".into(),
                    },
                )]
                .into_iter()
                .collect(),
            }),
        );

        assert_eq!(r1.entry("k"), entry("remote", 3));
        assert!(r1.replica.rumors.is_empty());
    }

    #[tokio::test]
    async fn quorum_read_picks_majority_at_max_version() {
        let mut r1 = create(1, &[2, 3, 4], options());
        r1.seed("k", "a", 3);

        let rx = r1.start_get("k");
        let calls = r1.sent();
        assert_eq!(calls.len(), 3);
        for call in calls.iter() {
            assert_eq!(
                call.message,
                Message::QuorumCall(QuorumCallMessage {
                    key: "k".into(),
                    version: Version::new(3),
                })
            );
        }

        let response = |value: &str, version: u64| {
            Message::QuorumResponse(QuorumResponseMessage {
                key: "k".into(),
                value: value.into(),
                version: Version::new(version),
            })
        };
        r1.receive(addr(2), response("b", 3));
        r1.receive(addr(3), response("a", 3));
        // Duplicate from the same peer doesn't count twice.
        r1.receive(addr(2), response("b", 3));
        r1.receive(addr(2), response("b", 3));

        r1.fire_quorum_timeouts("k");

        let output = rx.await.unwrap().unwrap();
        assert_eq!(output.value, "a");
        assert_eq!(output.version, Version::new(3));
        assert_eq!(output.votes, 2);
        assert!(r1.replica.quorums.is_empty());
    }

    #[tokio::test]
    async fn overlapping_gets_each_run_their_own_read() {
        let mut r1 = create(1, &[2], options());

        let rx1 = r1.start_get("k");
        let rx2 = r1.start_get("k");
        assert_eq!(r1.sent().len(), 2);
        assert_eq!(r1.replica.quorums.len(), 2);

        // One response counts toward both reads.
        r1.receive(
            addr(2),
            Message::QuorumResponse(QuorumResponseMessage {
                key: "k".into(),
                value: "v".into(),
                version: Version::new(1),
            }),
        );
        r1.fire_quorum_timeouts("k");

        assert_eq!(rx1.await.unwrap().unwrap().value, "v");
        assert_eq!(rx2.await.unwrap().unwrap().value, "v");
        assert!(r1.replica.quorums.is_empty());
    }

    #[tokio::test]
    async fn get_started_after_local_write_sees_it() {
        let mut r1 = create(1, &[2], options());

        let before = r1.start_get("k");
        r1.put("k", "v");
        let after = r1.start_get("k");
        let calls: Vec<_> = r1
            .sent()
            .into_iter()
            .filter(|datagram| matches!(datagram.message, Message::QuorumCall(_)))
            .collect();
        assert_eq!(calls[1].message, Message::QuorumCall(QuorumCallMessage {
            key: "k".into(),
            version: Version::new(1),
        }));

        r1.fire_quorum_timeouts("k");

        assert!(matches!(before.await.unwrap(), Err(GetError::NoResponses)));
        let output = after.await.unwrap().unwrap();
        assert_eq!(output.value, "v");
        assert_eq!(output.version, Version::new(1));
        assert_eq!(output.votes, 1);
    }

    #[tokio::test]
    async fn stale_quorum_tick_is_ignored() {
        let mut r1 = create(1, &[2], options());
        let rx = r1.start_get("k");

        r1.replica.handle_quorum_timeout(QuorumTimerTick {
            key: "k".into(),
            coordinator_id: 999,
        });
        assert_eq!(r1.replica.quorums.len(), 1);

        r1.fire_quorum_timeouts("k");
        assert!(matches!(rx.await.unwrap(), Err(GetError::NoResponses)));
    }

    #[tokio::test]
    async fn peer_version_at_the_ceiling_does_not_break_local_writes() {
        let mut r1 = create(1, &[2], options());
        r1.receive(
            addr(2),
            Message::AntiEntropyFinal(FinalMessage {
                updates: vec![(
                    "k".to_string(),
                    VersionedValue {
                        version: Version::MAX,
                        value: "remote".into(),
                    },
                )]
                .into_iter()
                .collect(),
            }),
        );
        assert_eq!(r1.entry("k"), Some(VersionedValue {
            version: Version::MAX,
            value: "remote".into(),
        }));

        let result = r1.replica.handle_local_put(PutInput {
            key: "k".into(),
            value: "local".into(),
        });
        assert!(matches!(result, Err(PutError::VersionExhausted(_))));
        assert_eq!(r1.entry("k").unwrap().value, "remote");

        // Other keys are unaffected.
        assert_eq!(r1.put("other", "v"), Version::new(1));
    }

    #[tokio::test]
    async fn late_quorum_response_is_dropped() {
        let mut r1 = create(1, &[2], options());
        r1.receive(
            addr(2),
            Message::QuorumResponse(QuorumResponseMessage {
                key: "k".into(),
                value: "v".into(),
                version: Version::new(1),
            }),
        );

        assert!(r1.replica.quorums.is_empty());
        assert!(r1.sent().is_empty());
    }

    #[tokio::test]
    async fn quorum_call_is_answered_only_when_up_to_date() {
        let mut r2 = create(2, &[1], options());
        r2.seed("k", "v", 2);

        let call = |key: &str, version: u64| {
            Message::QuorumCall(QuorumCallMessage {
                key: key.into(),
                version: Version::new(version),
            })
        };

        r2.receive(addr(1), call("k", 3));
        r2.receive(addr(1), call("missing", 0));
        assert!(r2.sent().is_empty());

        r2.receive(addr(1), call("k", 2));
        assert_eq!(r2.sent(), vec![OutboundDatagram {
            to: addr(1),
            message: Message::QuorumResponse(QuorumResponseMessage {
                key: "k".into(),
                value: "v".into(),
                version: Version::new(2),
            }),
        }]);
    }

    #[tokio::test]
    async fn delete_is_unimplemented() {
        let mut r1 = create(1, &[2], options());
        r1.put("k", "v");

        let result = r1.replica.handle_local_delete(DeleteInput { key: "k".into() });
        assert!(matches!(result, Err(DeleteError::Unimplemented)));
        assert_eq!(r1.entry("k"), entry("v", 1));
    }

    #[tokio::test]
    async fn lone_replica_does_not_gossip() {
        let mut r1 = create(1, &[], options());

        r1.put("k", "v");
        r1.replica.handle_anti_entropy_timer();

        assert!(r1.sent().is_empty());
        assert!(r1.replica.rumors.is_empty());
        assert_eq!(r1.entry("k"), entry("v", 1));
    }
}
