//! Publication set for one synthesis pass.
//!
//! Collects the per-type resource collections produced by a pass, applies the
//! canonical ordering to every one of them, and encodes the result into named
//! `google.protobuf.Any` payloads for the discovery transport. The set is
//! transient: built fresh each pass and discarded after publication.

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use envoy_types::pb::envoy::config::listener::v3::Listener;
use envoy_types::pb::envoy::config::route::v3::RouteConfiguration;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::Secret;
use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use tracing::debug;

use crate::xds::sorter;

pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub const ENDPOINT_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";
pub const SECRET_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.Secret";

/// A built Envoy resource along with its name.
#[derive(Clone, Debug)]
pub struct BuiltResource {
    pub name: String,
    pub resource: Any,
}

impl BuiltResource {
    pub fn into_any(self) -> Any {
        self.resource
    }

    pub fn type_url(&self) -> &str {
        &self.resource.type_url
    }
}

/// Per-type resource collections of one synthesis pass.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    pub clusters: Vec<Cluster>,
    pub load_assignments: Vec<ClusterLoadAssignment>,
    pub listeners: Vec<Listener>,
    pub route_configurations: Vec<RouteConfiguration>,
    pub secrets: Vec<Secret>,
}

impl ResourceSet {
    /// Apply the canonical ordering to every collection, including each
    /// listener's filter chains. Idempotent; reorders in place only.
    pub fn finalize(&mut self) {
        sorter::sort_resources(&mut self.clusters);
        sorter::sort_resources(&mut self.load_assignments);
        for listener in &mut self.listeners {
            sorter::sort_resources(&mut listener.filter_chains);
        }
        sorter::sort_resources(&mut self.listeners);
        sorter::sort_resources(&mut self.route_configurations);
        sorter::sort_resources(&mut self.secrets);

        debug!(
            clusters = self.clusters.len(),
            load_assignments = self.load_assignments.len(),
            listeners = self.listeners.len(),
            route_configurations = self.route_configurations.len(),
            secrets = self.secrets.len(),
            "resource set finalized"
        );
    }

    /// Finalize and encode everything for publication, in discovery order:
    /// clusters, load assignments, listeners, route configurations, secrets.
    pub fn into_resources(mut self) -> Vec<BuiltResource> {
        self.finalize();

        let mut built = Vec::with_capacity(
            self.clusters.len()
                + self.load_assignments.len()
                + self.listeners.len()
                + self.route_configurations.len()
                + self.secrets.len(),
        );

        for cluster in &self.clusters {
            built.push(encode(&cluster.name, CLUSTER_TYPE_URL, cluster));
        }
        for assignment in &self.load_assignments {
            built.push(encode(&assignment.cluster_name, ENDPOINT_TYPE_URL, assignment));
        }
        for listener in &self.listeners {
            built.push(encode(&listener.name, LISTENER_TYPE_URL, listener));
        }
        for route_configuration in &self.route_configurations {
            built.push(encode(&route_configuration.name, ROUTE_TYPE_URL, route_configuration));
        }
        for secret in &self.secrets {
            built.push(encode(&secret.name, SECRET_TYPE_URL, secret));
        }

        built
    }
}

fn encode<M: Message>(name: &str, type_url: &str, resource: &M) -> BuiltResource {
    BuiltResource {
        name: name.to_string(),
        resource: Any {
            type_url: type_url.to_string(),
            value: resource.encode_to_vec(),
        },
    }
}
