//! Envoy xDS resource synthesis
//!
//! Converts validated routing and policy inputs into Envoy v3 wire resources
//! and applies the canonical ordering every collection must carry before
//! publication. The surrounding control plane owns watching, model building,
//! and the discovery transport; this module owns only the translation and
//! ordering semantics.

pub mod filters;
pub mod resources;
pub mod route;
pub mod sorter;
pub mod validation;

pub use resources::{BuiltResource, ResourceSet};
pub use route::{
    HeaderMatchSpec, PathMatch, RouteActionSpec, RouteConfigSpec, RouteMatchSpec, RouteRule,
    VirtualHostSpec, WeightedClusterSpec,
};
pub use sorter::{comparator, sort_resources, ResourceOrder};
pub use validation::{LogReporter, ValidityReporter};
