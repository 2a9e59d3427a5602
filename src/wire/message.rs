use crate::replica::{Version, VersionedValue};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// key -> version, e.g. a replica's full state in an anti-entropy probe.
pub(crate) type VersionMap = BTreeMap<String, Version>;

/// key -> (version, value), e.g. an anti-entropy update batch.
pub(crate) type VersionedValueMap = BTreeMap<String, VersionedValue>;

/// Every kind of datagram replicas exchange. On the wire these are flat attribute maps; which
/// attributes are present decides the variant (see `codec`).
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Message {
    Rumor(RumorMessage),
    Ack(AckMessage),
    AntiEntropyProbe(ProbeMessage),
    AntiEntropyReply(ReplyMessage),
    AntiEntropyFinal(FinalMessage),
    QuorumCall(QuorumCallMessage),
    QuorumResponse(QuorumResponseMessage),
}

/// An update being pushed epidemically. `return_addr` is the replica that forwarded it to us, which
/// is where the ack goes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RumorMessage {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) version: Version,
    pub(crate) return_addr: SocketAddr,
}

/// `accepted` is `Ack=1` on the wire: the receiver didn't have this version and now does.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AckMessage {
    pub(crate) accepted: bool,
    pub(crate) key: String,
    pub(crate) version: Version,
}

/// Anti-entropy phase 1: the initiator's whole state.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProbeMessage {
    pub(crate) state: VersionMap,
    pub(crate) return_addr: SocketAddr,
}

/// Anti-entropy phase 1 response.
///
/// * `state` - the responder's whole state
/// * `needed` - keys the responder wants from the initiator ("UpdatesFromOrigin")
/// * `offered` - values the responder is donating to the initiator ("UpdatesToOrigin")
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ReplyMessage {
    pub(crate) state: VersionMap,
    pub(crate) needed: VersionMap,
    pub(crate) offered: VersionedValueMap,
}

/// Anti-entropy phase 2: the initiator's answer to `ReplyMessage::needed`. Nothing follows it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FinalMessage {
    pub(crate) updates: VersionedValueMap,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct QuorumCallMessage {
    pub(crate) key: String,
    pub(crate) version: Version,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct QuorumResponseMessage {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) version: Version,
}

/// A decoded datagram plus the address it arrived from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct InboundMessage {
    pub(crate) from: SocketAddr,
    pub(crate) message: Message,
}
