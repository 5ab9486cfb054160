//! Route table synthesis.
//!
//! Converts upstream route-configuration specs into Envoy
//! `route::v3::RouteConfiguration` resources. Each virtual host is one
//! configuration unit: its policy either translates cleanly and the host is
//! emitted, or translation fails and every route under that host is dropped
//! (fail-closed) while the failure is forwarded to the validity reporter.
//! One host's invalid policy never affects its siblings.
//!
//! Emitted collections carry the canonical order: virtual hosts by name,
//! routes by match specificity, header-matcher and weighted-cluster lists by
//! their respective chains.

use std::collections::HashMap;

use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier, route::Action, route_action::ClusterSpecifier,
    route_match::PathSpecifier, weighted_cluster::ClusterWeight, HeaderMatcher, Route,
    RouteAction, RouteConfiguration, RouteMatch, VirtualHost, WeightedCluster,
};
use envoy_types::pb::envoy::r#type::matcher::v3::RegexMatcher;
use envoy_types::pb::google::protobuf::{Duration, UInt32Value};
use serde::{Deserialize, Serialize};

use crate::xds::filters::http::cors::{CorsPolicyConfig, CORS_FILTER_NAME};
use crate::xds::sorter;
use crate::xds::validation::ValidityReporter;
use crate::{Error, Result};

/// Upstream representation of one route configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfigSpec {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHostSpec>,
}

/// Upstream representation of a virtual host: a routing unit keyed by host
/// names, owning an ordered list of routes and optional traffic policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualHostSpec {
    pub name: String,
    pub domains: Vec<String>,
    #[serde(default)]
    pub cors: Option<CorsPolicyConfig>,
    pub routes: Vec<RouteRule>,
}

/// Upstream representation of one route rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(default)]
    pub name: Option<String>,
    pub r#match: RouteMatchSpec,
    pub action: RouteActionSpec,
}

/// Matching criteria for a route rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMatchSpec {
    pub path: PathMatch,
    #[serde(default)]
    pub headers: Vec<HeaderMatchSpec>,
}

/// Path matching variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PathMatch {
    Prefix(String),
    Exact(String),
    Regex(String),
}

/// Header matching: an exact value when `value` is set, otherwise a
/// presence-only match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderMatchSpec {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub present: Option<bool>,
}

/// Forwarding action for a route rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RouteActionSpec {
    Cluster {
        name: String,
        /// Upstream timeout in seconds.
        timeout: Option<u64>,
    },
    WeightedClusters {
        clusters: Vec<WeightedClusterSpec>,
    },
}

/// One member of a weighted-cluster action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedClusterSpec {
    pub name: String,
    pub weight: u32,
}

impl RouteConfigSpec {
    /// Build the Envoy route configuration, reporting a validity outcome per
    /// virtual host. Hosts whose policy fails translation are omitted
    /// entirely; structural errors in the spec itself abort the build.
    pub fn to_envoy(&self, reporter: &dyn ValidityReporter) -> Result<RouteConfiguration> {
        if self.name.trim().is_empty() {
            return Err(Error::config("route configuration requires a name"));
        }

        let mut virtual_hosts = Vec::with_capacity(self.virtual_hosts.len());
        for vhost in &self.virtual_hosts {
            match vhost.to_envoy() {
                Ok(virtual_host) => {
                    reporter.report_valid(&vhost.name);
                    virtual_hosts.push(virtual_host);
                }
                Err(Error::InvalidPolicy(reason)) => {
                    // All-or-nothing per unit: the host and every route under
                    // it vanish from the emitted table.
                    reporter.report_invalid(&vhost.name, &reason);
                }
                Err(other) => return Err(other),
            }
        }

        sorter::sort_resources(&mut virtual_hosts);

        Ok(RouteConfiguration {
            name: self.name.clone(),
            virtual_hosts,
            ..Default::default()
        })
    }
}

impl VirtualHostSpec {
    fn to_envoy(&self) -> Result<VirtualHost> {
        if self.domains.is_empty() {
            return Err(Error::config(format!(
                "virtual host '{}' requires at least one domain",
                self.name
            )));
        }

        let mut routes = self
            .routes
            .iter()
            .map(|rule| rule.to_envoy())
            .collect::<Result<Vec<_>>>()?;
        sorter::sort_resources(&mut routes);

        let mut virtual_host = VirtualHost {
            name: self.name.clone(),
            domains: self.domains.clone(),
            routes,
            ..Default::default()
        };

        if let Some(cors) = &self.cors {
            let any = cors.to_any()?;
            virtual_host.typed_per_filter_config =
                HashMap::from([(CORS_FILTER_NAME.to_string(), any)]);
        }

        Ok(virtual_host)
    }
}

impl RouteRule {
    fn to_envoy(&self) -> Result<Route> {
        Ok(Route {
            name: self.name.clone().unwrap_or_default(),
            r#match: Some(self.r#match.to_envoy()?),
            action: Some(self.action.to_envoy()),
            ..Default::default()
        })
    }
}

impl RouteMatchSpec {
    fn to_envoy(&self) -> Result<RouteMatch> {
        let path_specifier = match &self.path {
            PathMatch::Prefix(prefix) => PathSpecifier::Prefix(prefix.clone()),
            PathMatch::Exact(path) => PathSpecifier::Path(path.clone()),
            PathMatch::Regex(regex) => PathSpecifier::SafeRegex(RegexMatcher {
                regex: regex.clone(),
                ..Default::default()
            }),
        };

        let mut headers = self
            .headers
            .iter()
            .map(|header| header.to_envoy())
            .collect::<Result<Vec<_>>>()?;
        sorter::sort_resources(&mut headers);

        Ok(RouteMatch {
            path_specifier: Some(path_specifier),
            headers,
            ..Default::default()
        })
    }
}

impl HeaderMatchSpec {
    #[allow(deprecated)]
    fn to_envoy(&self) -> Result<HeaderMatcher> {
        let specifier = match (&self.value, self.present) {
            (Some(value), _) => HeaderMatchSpecifier::ExactMatch(value.clone()),
            (None, Some(_)) => HeaderMatchSpecifier::PresentMatch(true),
            (None, None) => {
                return Err(Error::config(format!(
                    "header match '{}' requires a value or a presence flag",
                    self.name
                )))
            }
        };

        Ok(HeaderMatcher {
            name: self.name.clone(),
            header_match_specifier: Some(specifier),
            ..Default::default()
        })
    }
}

impl RouteActionSpec {
    fn to_envoy(&self) -> Action {
        match self {
            RouteActionSpec::Cluster { name, timeout } => Action::Route(RouteAction {
                cluster_specifier: Some(ClusterSpecifier::Cluster(name.clone())),
                timeout: timeout.map(|seconds| Duration {
                    seconds: seconds as i64,
                    nanos: 0,
                }),
                ..Default::default()
            }),
            RouteActionSpec::WeightedClusters { clusters } => {
                let mut weights: Vec<ClusterWeight> = clusters
                    .iter()
                    .map(|cluster| ClusterWeight {
                        name: cluster.name.clone(),
                        weight: Some(UInt32Value {
                            value: cluster.weight,
                        }),
                        ..Default::default()
                    })
                    .collect();
                sorter::sort_resources(&mut weights);

                Action::Route(RouteAction {
                    cluster_specifier: Some(ClusterSpecifier::WeightedClusters(WeightedCluster {
                        clusters: weights,
                        ..Default::default()
                    })),
                    ..Default::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::envoy::extensions::filters::http::cors::v3::CorsPolicy;
    use prost::Message;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingReporter {
        valid: RefCell<Vec<String>>,
        invalid: RefCell<Vec<(String, String)>>,
    }

    impl ValidityReporter for RecordingReporter {
        fn report_valid(&self, unit: &str) {
            self.valid.borrow_mut().push(unit.to_string());
        }

        fn report_invalid(&self, unit: &str, reason: &str) {
            self.invalid
                .borrow_mut()
                .push((unit.to_string(), reason.to_string()));
        }
    }

    fn cluster_route(prefix: &str, cluster: &str) -> RouteRule {
        RouteRule {
            name: None,
            r#match: RouteMatchSpec {
                path: PathMatch::Prefix(prefix.to_string()),
                headers: Vec::new(),
            },
            action: RouteActionSpec::Cluster {
                name: cluster.to_string(),
                timeout: None,
            },
        }
    }

    fn vhost_with_cors(name: &str, max_age: &str) -> VirtualHostSpec {
        VirtualHostSpec {
            name: name.to_string(),
            domains: vec![name.to_string()],
            cors: Some(CorsPolicyConfig {
                allow_origin: vec!["*".into()],
                allow_credentials: true,
                max_age: Some(max_age.to_string()),
                ..Default::default()
            }),
            routes: vec![cluster_route("/", "svc1")],
        }
    }

    #[test]
    fn valid_cors_policy_is_attached_to_the_virtual_host() {
        let spec = RouteConfigSpec {
            name: "ingress_http".into(),
            virtual_hosts: vec![vhost_with_cors("hello.world", "10m")],
        };
        let reporter = RecordingReporter::default();

        let config = spec.to_envoy(&reporter).expect("build");
        assert_eq!(config.name, "ingress_http");
        assert_eq!(config.virtual_hosts.len(), 1);

        let vhost = &config.virtual_hosts[0];
        let any = vhost
            .typed_per_filter_config
            .get(CORS_FILTER_NAME)
            .expect("cors config attached");
        let policy = CorsPolicy::decode(any.value.as_slice()).expect("decode");
        assert_eq!(policy.max_age, "600");
        assert!(policy.allow_origin_string_match[0].ignore_case);

        assert_eq!(*reporter.valid.borrow(), vec!["hello.world".to_string()]);
        assert!(reporter.invalid.borrow().is_empty());
    }

    #[test]
    fn invalid_cors_policy_drops_every_route_of_the_host() {
        let spec = RouteConfigSpec {
            name: "ingress_http".into(),
            virtual_hosts: vec![vhost_with_cors("hello.world", "-10m")],
        };
        let reporter = RecordingReporter::default();

        let config = spec.to_envoy(&reporter).expect("build");
        // Fail-closed: the host vanishes from the emitted table entirely.
        assert!(config.virtual_hosts.is_empty());

        let invalid = reporter.invalid.borrow();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].0, "hello.world");
        assert!(invalid[0].1.contains("max_age"));
    }

    #[test]
    fn one_invalid_host_does_not_affect_its_siblings() {
        let spec = RouteConfigSpec {
            name: "ingress_http".into(),
            virtual_hosts: vec![
                vhost_with_cors("bad.example", "-10m"),
                vhost_with_cors("good.example", "0s"),
            ],
        };
        let reporter = RecordingReporter::default();

        let config = spec.to_envoy(&reporter).expect("build");
        assert_eq!(config.virtual_hosts.len(), 1);
        assert_eq!(config.virtual_hosts[0].name, "good.example");
        assert_eq!(config.virtual_hosts[0].routes.len(), 1);

        assert_eq!(*reporter.valid.borrow(), vec!["good.example".to_string()]);
        assert_eq!(reporter.invalid.borrow().len(), 1);
    }

    #[test]
    fn emitted_collections_carry_canonical_order() {
        let spec = RouteConfigSpec {
            name: "ingress_http".into(),
            virtual_hosts: vec![
                VirtualHostSpec {
                    name: "zzz.example".into(),
                    domains: vec!["zzz.example".into()],
                    cors: None,
                    routes: vec![
                        cluster_route("/short", "svc1"),
                        cluster_route("/much/longer/prefix", "svc2"),
                        RouteRule {
                            name: None,
                            r#match: RouteMatchSpec {
                                path: PathMatch::Regex(".".into()),
                                headers: Vec::new(),
                            },
                            action: RouteActionSpec::WeightedClusters {
                                clusters: vec![
                                    WeightedClusterSpec {
                                        name: "second".into(),
                                        weight: 20,
                                    },
                                    WeightedClusterSpec {
                                        name: "first".into(),
                                        weight: 10,
                                    },
                                ],
                            },
                        },
                    ],
                },
                VirtualHostSpec {
                    name: "aaa.example".into(),
                    domains: vec!["aaa.example".into()],
                    cors: None,
                    routes: vec![cluster_route("/", "svc3")],
                },
            ],
        };
        let reporter = RecordingReporter::default();

        let config = spec.to_envoy(&reporter).expect("build");
        assert_eq!(config.virtual_hosts[0].name, "aaa.example");
        assert_eq!(config.virtual_hosts[1].name, "zzz.example");

        // Regex route first, then prefix routes longest-first.
        let routes = &config.virtual_hosts[1].routes;
        let paths: Vec<_> = routes
            .iter()
            .map(|r| r.r#match.as_ref().unwrap().path_specifier.clone().unwrap())
            .collect();
        assert!(matches!(paths[0], PathSpecifier::SafeRegex(_)));
        assert_eq!(
            paths[1],
            PathSpecifier::Prefix("/much/longer/prefix".into())
        );
        assert_eq!(paths[2], PathSpecifier::Prefix("/short".into()));

        // Weighted clusters sorted by name.
        let Some(Action::Route(action)) = &routes[0].action else {
            panic!("expected route action");
        };
        let Some(ClusterSpecifier::WeightedClusters(weighted)) = &action.cluster_specifier else {
            panic!("expected weighted clusters");
        };
        assert_eq!(weighted.clusters[0].name, "first");
        assert_eq!(weighted.clusters[1].name, "second");
    }

    #[test]
    fn header_match_specs_translate_and_sort() {
        let rule = RouteRule {
            name: None,
            r#match: RouteMatchSpec {
                path: PathMatch::Prefix("/".into()),
                headers: vec![
                    HeaderMatchSpec {
                        name: "x-beta".into(),
                        value: None,
                        present: Some(true),
                    },
                    HeaderMatchSpec {
                        name: "x-alpha".into(),
                        value: Some("1".into()),
                        present: None,
                    },
                ],
            },
            action: RouteActionSpec::Cluster {
                name: "svc".into(),
                timeout: Some(30),
            },
        };

        let route = rule.to_envoy().expect("build");
        let headers = &route.r#match.as_ref().unwrap().headers;
        assert_eq!(headers[0].name, "x-alpha");
        assert_eq!(headers[1].name, "x-beta");
    }

    #[test]
    fn header_match_without_value_or_presence_is_rejected() {
        let spec = HeaderMatchSpec {
            name: "x-broken".into(),
            value: None,
            present: None,
        };
        assert!(matches!(spec.to_envoy(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_domains_are_a_structural_error() {
        let spec = RouteConfigSpec {
            name: "ingress_http".into(),
            virtual_hosts: vec![VirtualHostSpec {
                name: "broken".into(),
                domains: Vec::new(),
                cors: None,
                routes: Vec::new(),
            }],
        };
        let reporter = RecordingReporter::default();
        assert!(matches!(spec.to_envoy(&reporter), Err(Error::Config(_))));
    }

    #[test]
    fn specs_deserialize_from_json() {
        let spec: RouteConfigSpec = serde_json::from_str(
            r#"{
                "name": "ingress_http",
                "virtual_hosts": [{
                    "name": "hello.world",
                    "domains": ["hello.world"],
                    "cors": {"allow_origin": ["*"], "max_age": "10m"},
                    "routes": [{
                        "match": {"path": {"Prefix": "/"}},
                        "action": {"Cluster": {"name": "svc1", "timeout": null}}
                    }]
                }]
            }"#,
        )
        .expect("deserialize");

        assert_eq!(spec.virtual_hosts.len(), 1);
        assert!(spec.virtual_hosts[0].cors.is_some());
    }
}
