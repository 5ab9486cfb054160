//! Typed-config utilities for Envoy HTTP filters.
//!
//! Filter modules follow a consistent pattern: a serde configuration struct,
//! a `validate()` method, and conversion into the Envoy protobuf message
//! wrapped in a `google.protobuf.Any` for attachment to listeners, virtual
//! hosts, or routes.

pub mod http;

use envoy_types::pb::google::protobuf::Any;
use prost::Message;

/// Builds an Envoy `Any` value from a prost message and its type URL.
pub fn any_from_message<M: Message>(type_url: impl Into<String>, msg: &M) -> Any {
    Any {
        type_url: type_url.into(),
        value: msg.encode_to_vec(),
    }
}
