//! Canonical ordering for Envoy resource collections
//!
//! Envoy evaluates routes and filter chains top-down and acts on the first
//! match, so the order of every published collection is the de facto matching
//! priority, not a cosmetic detail. Each supported resource kind gets a
//! documented, field-by-field precedence chain here; collections are only ever
//! sorted with `slice::sort_by` (a stable sort), so any elements the chain
//! leaves tied keep their input order.
//!
//! The supported kinds form a closed set: the [`ResourceOrder`] impls in this
//! file. Adding a kind means adding an impl, a deliberate and visible change.
//! Collections whose kind is outside the set only reach the sorter as opaque
//! `google.protobuf.Any` payloads, which carry a neutral comparator: every
//! element compares equal and a stable sort leaves the collection untouched.

use std::cmp::Ordering;

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use envoy_types::pb::envoy::config::listener::v3::{FilterChain, Listener};
use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier, route_match::PathSpecifier,
    weighted_cluster::ClusterWeight, HeaderMatcher, Route, RouteConfiguration, RouteMatch,
    VirtualHost,
};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::tcp_proxy::weighted_cluster::ClusterWeight as TcpClusterWeight;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::Secret;
use envoy_types::pb::envoy::r#type::matcher::v3::string_matcher::MatchPattern;
use envoy_types::pb::google::protobuf::Any;

/// Total, deterministic less-than relation for one resource kind.
///
/// Every implementation must be a strict weak ordering (irreflexive,
/// antisymmetric, transitive) so a stable sort terminates with a well-defined
/// order for equal-ranked elements. Implementations never mutate and never
/// fail.
pub trait ResourceOrder {
    fn resource_cmp(&self, other: &Self) -> Ordering;
}

/// Returns the comparator registered for `T`'s resource kind.
pub fn comparator<T: ResourceOrder>() -> fn(&T, &T) -> Ordering {
    T::resource_cmp
}

/// Stable-sorts a homogeneous resource collection into canonical order.
///
/// Reorders in place; no element is added, removed, or mutated in value.
pub fn sort_resources<T: ResourceOrder>(resources: &mut [T]) {
    resources.sort_by(comparator::<T>());
}

impl ResourceOrder for RouteConfiguration {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl ResourceOrder for VirtualHost {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl ResourceOrder for Secret {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl ResourceOrder for Cluster {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl ResourceOrder for ClusterLoadAssignment {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.cluster_name.cmp(&other.cluster_name)
    }
}

impl ResourceOrder for Listener {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl ResourceOrder for ClusterWeight {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| weight_value(self).cmp(&weight_value(other)))
    }
}

impl ResourceOrder for TcpClusterWeight {
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.weight.cmp(&other.weight))
    }
}

impl ResourceOrder for Route {
    /// More specific routes must come first:
    ///
    /// 1. path-specifier kind (regex matches before prefix matches),
    /// 2. descending length of the specifier text within equal kind,
    /// 3. descending header-matcher count,
    /// 4. element-wise header-matcher comparison, first difference decides.
    fn resource_cmp(&self, other: &Self) -> Ordering {
        let lhs = self.r#match.as_ref();
        let rhs = other.r#match.as_ref();

        path_kind_rank(lhs)
            .cmp(&path_kind_rank(rhs))
            .then_with(|| path_text_len(rhs).cmp(&path_text_len(lhs)))
            .then_with(|| match_headers(rhs).len().cmp(&match_headers(lhs).len()))
            .then_with(|| cmp_header_lists(match_headers(lhs), match_headers(rhs)))
    }
}

impl ResourceOrder for HeaderMatcher {
    /// Header name first, then a fixed specifier-kind priority (exact-value
    /// before presence-only), then the match value.
    fn resource_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| {
                header_kind_rank(self.header_match_specifier.as_ref())
                    .cmp(&header_kind_rank(other.header_match_specifier.as_ref()))
            })
            .then_with(|| {
                header_match_value(self.header_match_specifier.as_ref())
                    .cmp(header_match_value(other.header_match_specifier.as_ref()))
            })
    }
}

impl ResourceOrder for FilterChain {
    /// Only the first server name of the chain's match participates; chains
    /// with no server names (catch-all chains) rank after every chain that
    /// has at least one.
    fn resource_cmp(&self, other: &Self) -> Ordering {
        match (first_server_name(self), first_server_name(other)) {
            (Some(lhs), Some(rhs)) => lhs.cmp(rhs),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Neutral comparator for payloads whose concrete kind is not enumerated
/// above. Everything compares equal, so a stable sort is a no-op and callers
/// with nothing to sort proceed silently.
impl ResourceOrder for Any {
    fn resource_cmp(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// Fixed slot per path-specifier kind. Regex ("pattern") specifiers rank
/// before prefix specifiers regardless of text length; the remaining v3 kinds
/// occupy a fixed tail so the relation stays total.
fn path_kind_rank(route_match: Option<&RouteMatch>) -> u8 {
    match route_match.and_then(|m| m.path_specifier.as_ref()) {
        Some(PathSpecifier::SafeRegex(_)) => 0,
        Some(PathSpecifier::Prefix(_)) => 1,
        Some(PathSpecifier::Path(_)) => 2,
        Some(PathSpecifier::PathSeparatedPrefix(_)) => 3,
        Some(PathSpecifier::PathMatchPolicy(_)) => 4,
        Some(PathSpecifier::ConnectMatcher(_)) => 5,
        None => 6,
    }
}

/// Length of the path specifier text, used longest-first within equal kind.
fn path_text_len(route_match: Option<&RouteMatch>) -> usize {
    match route_match.and_then(|m| m.path_specifier.as_ref()) {
        Some(PathSpecifier::SafeRegex(matcher)) => matcher.regex.len(),
        Some(PathSpecifier::Prefix(text))
        | Some(PathSpecifier::Path(text))
        | Some(PathSpecifier::PathSeparatedPrefix(text)) => text.len(),
        _ => 0,
    }
}

fn match_headers(route_match: Option<&RouteMatch>) -> &[HeaderMatcher] {
    route_match.map(|m| m.headers.as_slice()).unwrap_or(&[])
}

fn cmp_header_lists(lhs: &[HeaderMatcher], rhs: &[HeaderMatcher]) -> Ordering {
    for (a, b) in lhs.iter().zip(rhs) {
        let ordering = a.resource_cmp(b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Fixed slot per header-match specifier kind: exact-value matches rank before
/// presence-only matches, followed by regex, prefix, suffix, contains, the
/// generic string matcher, and range matches. Missing specifiers rank last.
#[allow(deprecated)]
fn header_kind_rank(specifier: Option<&HeaderMatchSpecifier>) -> u8 {
    match specifier {
        Some(HeaderMatchSpecifier::ExactMatch(_)) => 0,
        Some(HeaderMatchSpecifier::PresentMatch(_)) => 1,
        Some(HeaderMatchSpecifier::SafeRegexMatch(_)) => 2,
        Some(HeaderMatchSpecifier::PrefixMatch(_)) => 3,
        Some(HeaderMatchSpecifier::SuffixMatch(_)) => 4,
        Some(HeaderMatchSpecifier::ContainsMatch(_)) => 5,
        Some(HeaderMatchSpecifier::StringMatch(_)) => 6,
        Some(HeaderMatchSpecifier::RangeMatch(_)) => 7,
        None => 8,
    }
}

/// Text the specifier matches against, for the final tie-break. Kinds without
/// a match value (presence, range) compare as empty and stay input-ordered.
#[allow(deprecated)]
fn header_match_value(specifier: Option<&HeaderMatchSpecifier>) -> &str {
    match specifier {
        Some(HeaderMatchSpecifier::ExactMatch(value))
        | Some(HeaderMatchSpecifier::PrefixMatch(value))
        | Some(HeaderMatchSpecifier::SuffixMatch(value))
        | Some(HeaderMatchSpecifier::ContainsMatch(value)) => value,
        Some(HeaderMatchSpecifier::SafeRegexMatch(matcher)) => &matcher.regex,
        Some(HeaderMatchSpecifier::StringMatch(matcher)) => {
            match matcher.match_pattern.as_ref() {
                Some(MatchPattern::Exact(value))
                | Some(MatchPattern::Prefix(value))
                | Some(MatchPattern::Suffix(value))
                | Some(MatchPattern::Contains(value)) => value,
                Some(MatchPattern::SafeRegex(matcher)) => &matcher.regex,
                Some(MatchPattern::Custom(_)) | None => "",
            }
        }
        _ => "",
    }
}

fn weight_value(cluster_weight: &ClusterWeight) -> u32 {
    cluster_weight.weight.as_ref().map(|w| w.value).unwrap_or(0)
}

fn first_server_name(chain: &FilterChain) -> Option<&str> {
    chain
        .filter_chain_match
        .as_ref()
        .and_then(|m| m.server_names.first())
        .map(String::as_str)
}
