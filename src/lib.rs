//! # Portcullis
//!
//! Configuration synthesis for an Envoy-based ingress control plane.
//!
//! Portcullis is the layer between an upstream routing model and the xDS
//! transport: it translates validated policy inputs into the exact Envoy v3
//! wire resources a proxy consumes, and imposes a canonical, deterministic
//! order on every resource collection before it is published.
//!
//! ## Core Components
//!
//! - **Resource ordering** ([`xds::sorter`]): stable, per-kind comparators for
//!   every resource collection Envoy evaluates top-down.
//! - **Policy translation** ([`xds::filters::http::cors`]): fallible
//!   conversion of policy DTOs into typed filter configuration.
//! - **Route synthesis** ([`xds::route`]): virtual-host and route table
//!   construction with per-host validity outcomes.
//! - **Publication set** ([`xds::resources`]): the ordered, protobuf-encoded
//!   resource collections handed to the transport layer.
//!
//! Everything in this crate is pure and synchronous: no I/O, no shared state,
//! safe to run concurrently across independent synthesis passes.

pub mod errors;
pub mod observability;
pub mod xds;

pub use errors::{Error, Result};
pub use observability::init_tracing;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
