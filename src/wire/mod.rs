mod codec;
mod message;

pub(crate) use codec::decode;
pub(crate) use codec::encode;
pub(crate) use message::AckMessage;
pub(crate) use message::FinalMessage;
pub(crate) use message::InboundMessage;
pub(crate) use message::Message;
pub(crate) use message::ProbeMessage;
pub(crate) use message::QuorumCallMessage;
pub(crate) use message::QuorumResponseMessage;
pub(crate) use message::ReplyMessage;
pub(crate) use message::RumorMessage;
pub(crate) use message::VersionMap;
pub(crate) use message::VersionedValueMap;
