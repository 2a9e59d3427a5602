//! Translates between `Message` and the on-wire attribute map.
//!
//! A datagram carries no explicit type tag. Its type is decided by which attribute names are
//! present, using `SCHEMAS` below. Anything that doesn't fit a schema, or fits one but carries an
//! attribute of the wrong type, is rejected with a `DecodeError` and the caller drops it.

use crate::proto::{proto_attribute, ProtoAttribute, ProtoDatagram, ProtoEntry, ProtoEntryMap, ProtoVersionMap};
use crate::replica::{Version, VersionedValue};
use crate::wire::message::{
    AckMessage, FinalMessage, Message, ProbeMessage, QuorumCallMessage, QuorumResponseMessage, ReplyMessage,
    RumorMessage, VersionMap, VersionedValueMap,
};
use prost::Message as _;
use std::collections::{BTreeSet, HashMap};
use std::convert::TryFrom;
use std::net::{IpAddr, SocketAddr};

const KEY: &str = "Key";
const VALUE: &str = "Value";
const VERSION: &str = "Version";
const HOST: &str = "Host";
const PORT: &str = "Port";
const ACK: &str = "Ack";
const STATE: &str = "State";
const UPDATES_FROM_ORIGIN: &str = "UpdatesFromOrigin";
const UPDATES_TO_ORIGIN: &str = "UpdatesToOrigin";
const UPDATES: &str = "Updates";
const QUORUM_CALL: &str = "QuorumCall";
const QUORUM_ACK: &str = "QuorumAck";

#[derive(Copy, Clone, Debug, PartialEq)]
enum Kind {
    Rumor,
    Ack,
    Probe,
    Reply,
    Final,
    QuorumCall,
    QuorumResponse,
}

// Most specific first. The first schema whose attributes are all present wins.
const SCHEMAS: &[(Kind, &[&str])] = &[
    (Kind::QuorumResponse, &[QUORUM_ACK, KEY, VALUE, VERSION]),
    (Kind::QuorumCall, &[QUORUM_CALL, KEY, VERSION]),
    (Kind::Ack, &[ACK, KEY, VERSION]),
    (Kind::Reply, &[STATE, UPDATES_FROM_ORIGIN, UPDATES_TO_ORIGIN]),
    (Kind::Final, &[UPDATES]),
    (Kind::Probe, &[STATE, HOST, PORT]),
    (Kind::Rumor, &[KEY, VALUE, VERSION, HOST, PORT]),
];

#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    #[error("Datagram is not a valid attribute map: {0}")]
    Malformed(#[from] prost::DecodeError),
    #[error("Unrecognized attribute set: {0:?}")]
    Unrecognized(BTreeSet<String>),
    #[error("Attribute '{attribute}' is not a valid {expected}")]
    WrongType {
        attribute: &'static str,
        expected: &'static str,
    },
}

pub(crate) fn encode(message: &Message) -> Result<Vec<u8>, prost::EncodeError> {
    let datagram = ProtoDatagram {
        attributes: to_attributes(message).0,
    };

    let mut buf = Vec::with_capacity(datagram.encoded_len());
    datagram.encode(&mut buf)?;
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let datagram = ProtoDatagram::decode(bytes)?;
    let attributes = Attributes::from_proto(datagram.attributes);

    let kind = attributes.classify()?;
    let message = match kind {
        Kind::Rumor => Message::Rumor(RumorMessage {
            key: attributes.text(KEY)?.to_string(),
            value: attributes.text(VALUE)?.to_string(),
            version: attributes.version(VERSION)?,
            return_addr: attributes.return_addr()?,
        }),
        Kind::Ack => Message::Ack(AckMessage {
            accepted: attributes.flag(ACK)?,
            key: attributes.text(KEY)?.to_string(),
            version: attributes.version(VERSION)?,
        }),
        Kind::Probe => Message::AntiEntropyProbe(ProbeMessage {
            state: attributes.versions(STATE)?,
            return_addr: attributes.return_addr()?,
        }),
        Kind::Reply => Message::AntiEntropyReply(ReplyMessage {
            state: attributes.versions(STATE)?,
            needed: attributes.versions(UPDATES_FROM_ORIGIN)?,
            offered: attributes.entries(UPDATES_TO_ORIGIN)?,
        }),
        Kind::Final => Message::AntiEntropyFinal(FinalMessage {
            updates: attributes.entries(UPDATES)?,
        }),
        Kind::QuorumCall => Message::QuorumCall(QuorumCallMessage {
            key: attributes.text(KEY)?.to_string(),
            version: attributes.version(VERSION)?,
        }),
        Kind::QuorumResponse => Message::QuorumResponse(QuorumResponseMessage {
            key: attributes.text(KEY)?.to_string(),
            value: attributes.text(VALUE)?.to_string(),
            version: attributes.version(VERSION)?,
        }),
    };

    Ok(message)
}

fn to_attributes(message: &Message) -> AttributesBuilder {
    let builder = AttributesBuilder::default();
    match message {
        Message::Rumor(m) => builder
            .text(KEY, &m.key)
            .text(VALUE, &m.value)
            .version(VERSION, m.version)
            .return_addr(m.return_addr),
        Message::Ack(m) => builder
            .integer(ACK, if m.accepted { 1 } else { 0 })
            .text(KEY, &m.key)
            .version(VERSION, m.version),
        Message::AntiEntropyProbe(m) => builder.versions(STATE, &m.state).return_addr(m.return_addr),
        Message::AntiEntropyReply(m) => builder
            .versions(STATE, &m.state)
            .versions(UPDATES_FROM_ORIGIN, &m.needed)
            .entries(UPDATES_TO_ORIGIN, &m.offered),
        Message::AntiEntropyFinal(m) => builder.entries(UPDATES, &m.updates),
        Message::QuorumCall(m) => builder
            .integer(QUORUM_CALL, 1)
            .text(KEY, &m.key)
            .version(VERSION, m.version),
        Message::QuorumResponse(m) => builder
            .integer(QUORUM_ACK, 1)
            .text(KEY, &m.key)
            .text(VALUE, &m.value)
            .version(VERSION, m.version),
    }
}

#[derive(Default)]
struct AttributesBuilder(HashMap<String, ProtoAttribute>);

impl AttributesBuilder {
    fn put(mut self, name: &str, value: proto_attribute::Value) -> Self {
        self.0.insert(name.to_string(), ProtoAttribute { value: Some(value) });
        self
    }

    fn text(self, name: &str, text: &str) -> Self {
        self.put(name, proto_attribute::Value::Text(text.to_string()))
    }

    fn integer(self, name: &str, integer: i64) -> Self {
        self.put(name, proto_attribute::Value::Integer(integer))
    }

    fn version(self, name: &str, version: Version) -> Self {
        // Held versions never exceed Version::MAX, so this doesn't wrap.
        self.integer(name, version.as_u64() as i64)
    }

    fn versions(self, name: &str, versions: &VersionMap) -> Self {
        let versions = versions
            .iter()
            .map(|(key, version)| (key.clone(), version.as_u64()))
            .collect();
        self.put(name, proto_attribute::Value::Versions(ProtoVersionMap { versions }))
    }

    fn entries(self, name: &str, entries: &VersionedValueMap) -> Self {
        let entries = entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    ProtoEntry {
                        version: entry.version.as_u64(),
                        value: entry.value.clone(),
                    },
                )
            })
            .collect();
        self.put(name, proto_attribute::Value::Entries(ProtoEntryMap { entries }))
    }

    fn return_addr(self, addr: SocketAddr) -> Self {
        self.text(HOST, &addr.ip().to_string())
            .integer(PORT, addr.port() as i64)
    }
}

struct Attributes(HashMap<String, proto_attribute::Value>);

impl Attributes {
    fn from_proto(proto: HashMap<String, ProtoAttribute>) -> Self {
        // An attribute without a value is as good as absent.
        let attributes = proto
            .into_iter()
            .filter_map(|(name, attribute)| attribute.value.map(|value| (name, value)))
            .collect();

        Attributes(attributes)
    }

    fn classify(&self) -> Result<Kind, DecodeError> {
        SCHEMAS
            .iter()
            .find(|(_, required)| required.iter().all(|name| self.0.contains_key(*name)))
            .map(|(kind, _)| *kind)
            .ok_or_else(|| DecodeError::Unrecognized(self.0.keys().cloned().collect()))
    }

    fn text(&self, name: &'static str) -> Result<&str, DecodeError> {
        match self.0.get(name) {
            Some(proto_attribute::Value::Text(text)) => Ok(text),
            _ => Err(wrong_type(name, "string")),
        }
    }

    fn integer(&self, name: &'static str) -> Result<i64, DecodeError> {
        match self.0.get(name) {
            Some(proto_attribute::Value::Integer(integer)) => Ok(*integer),
            _ => Err(wrong_type(name, "integer")),
        }
    }

    fn version(&self, name: &'static str) -> Result<Version, DecodeError> {
        let raw = self.integer(name)?;
        u64::try_from(raw)
            .ok()
            .and_then(Version::bounded)
            .ok_or_else(|| wrong_type(name, "non-negative version"))
    }

    fn flag(&self, name: &'static str) -> Result<bool, DecodeError> {
        match self.integer(name)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(wrong_type(name, "0/1 flag")),
        }
    }

    fn versions(&self, name: &'static str) -> Result<VersionMap, DecodeError> {
        match self.0.get(name) {
            Some(proto_attribute::Value::Versions(map)) => map
                .versions
                .iter()
                .map(|(key, version)| Ok::<_, DecodeError>((key.clone(), map_version(name, *version)?)))
                .collect(),
            _ => Err(wrong_type(name, "key->version map")),
        }
    }

    fn entries(&self, name: &'static str) -> Result<VersionedValueMap, DecodeError> {
        match self.0.get(name) {
            Some(proto_attribute::Value::Entries(map)) => map
                .entries
                .iter()
                .map(|(key, entry)| {
                    let entry = VersionedValue {
                        version: map_version(name, entry.version)?,
                        value: entry.value.clone(),
                    };
                    Ok::<_, DecodeError>((key.clone(), entry))
                })
                .collect(),
            _ => Err(wrong_type(name, "key->{Version,Value} map")),
        }
    }

    fn return_addr(&self) -> Result<SocketAddr, DecodeError> {
        let ip: IpAddr = self.text(HOST)?.parse().map_err(|_| wrong_type(HOST, "IP address"))?;
        let port = u16::try_from(self.integer(PORT)?).map_err(|_| wrong_type(PORT, "port"))?;

        Ok(SocketAddr::new(ip, port))
    }
}

// Same bound as scalar Version attributes.
fn map_version(name: &'static str, version: u64) -> Result<Version, DecodeError> {
    Version::bounded(version).ok_or_else(|| wrong_type(name, "map of versions up to i64::MAX"))
}

fn wrong_type(attribute: &'static str, expected: &'static str) -> DecodeError {
    DecodeError::WrongType { attribute, expected }
}
