/// A datagram is a flat, self-describing attribute map. The set of attribute names present decides
/// which kind of message it is; see src/wire/codec.rs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDatagram {
    #[prost(map = "string, message", tag = "1")]
    pub attributes: ::std::collections::HashMap<::prost::alloc::string::String, ProtoAttribute>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAttribute {
    #[prost(oneof = "proto_attribute::Value", tags = "1, 2, 3, 4")]
    pub value: ::core::option::Option<proto_attribute::Value>,
}
/// Nested message and enum types in `ProtoAttribute`.
pub mod proto_attribute {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "1")]
        Text(::prost::alloc::string::String),
        #[prost(int64, tag = "2")]
        Integer(i64),
        #[prost(message, tag = "3")]
        Versions(super::ProtoVersionMap),
        #[prost(message, tag = "4")]
        Entries(super::ProtoEntryMap),
    }
}
/// key -> version
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoVersionMap {
    #[prost(map = "string, uint64", tag = "1")]
    pub versions: ::std::collections::HashMap<::prost::alloc::string::String, u64>,
}
/// key -> {Version, Value}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoEntryMap {
    #[prost(map = "string, message", tag = "1")]
    pub entries: ::std::collections::HashMap<::prost::alloc::string::String, ProtoEntry>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoEntry {
    #[prost(uint64, tag = "1")]
    pub version: u64,
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}
