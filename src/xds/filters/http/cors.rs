//! CORS policy translation to Envoy wire format.
//!
//! Takes the cross-origin policy attached to a virtual host upstream and
//! produces the `envoy.extensions.filters.http.cors.v3.CorsPolicy` message the
//! proxy consumes. Translation is fallible per configuration unit: any invalid
//! field yields a single [`Error::InvalidPolicy`] outcome and no wire resource,
//! and the caller drops the owning virtual host in its entirety.

use envoy_types::pb::envoy::extensions::filters::http::cors::v3::CorsPolicy;
use envoy_types::pb::envoy::r#type::matcher::v3::string_matcher::MatchPattern;
use envoy_types::pb::envoy::r#type::matcher::v3::StringMatcher;
use envoy_types::pb::google::protobuf::{Any, BoolValue};
use http::{header::HeaderName, Method};
use serde::{Deserialize, Serialize};

use crate::xds::filters::any_from_message;
use crate::{Error, Result};

pub const FILTER_CORS_POLICY_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.http.cors.v3.CorsPolicy";

/// Well-known name of Envoy's CORS filter, used as the
/// `typed_per_filter_config` key on virtual hosts.
pub const CORS_FILTER_NAME: &str = "envoy.filters.http.cors";

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Cross-origin policy as supplied by the upstream model, one per virtual
/// host.
///
/// `max_age` is a signed duration string in Go's `time.ParseDuration` grammar
/// (`"10m"`, `"0s"`, `"1h30m"`), which is how the source objects express it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsPolicyConfig {
    /// Allowed origin patterns, in caller order. Must not be empty.
    pub allow_origin: Vec<String>,
    /// Whether credentialed requests are allowed. Always emitted explicitly.
    #[serde(default)]
    pub allow_credentials: bool,
    /// HTTP methods allowed for cross-origin requests.
    #[serde(default)]
    pub allow_methods: Vec<String>,
    /// Request headers allowed in cross-origin requests.
    #[serde(default)]
    pub allow_headers: Vec<String>,
    /// Response headers exposed to cross-origin clients.
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// Preflight cache lifetime as a signed duration string. Optional.
    #[serde(default)]
    pub max_age: Option<String>,
}

impl CorsPolicyConfig {
    /// Validate field-level rules that do not depend on translation.
    pub fn validate(&self) -> Result<()> {
        if self.allow_origin.is_empty() {
            return Err(invalid("allow_origin requires at least one origin pattern"));
        }

        for origin in &self.allow_origin {
            if origin.trim().is_empty() {
                return Err(invalid("allow_origin entries cannot be empty"));
            }
        }

        for method in &self.allow_methods {
            if method.trim().is_empty() {
                return Err(invalid("allow_methods entries cannot be empty"));
            }
            if method.trim() != "*" {
                Method::from_bytes(method.trim().as_bytes()).map_err(|_| {
                    invalid(format!("invalid HTTP method in allow_methods: {method}"))
                })?;
            }
        }

        for header in &self.allow_headers {
            validate_header_name(header, "allow_headers")?;
        }

        for header in &self.expose_headers {
            validate_header_name(header, "expose_headers")?;
        }

        Ok(())
    }

    /// Translate into the Envoy CORS policy message.
    ///
    /// Origins become case-insensitive exact matches (`"*"` is an ordinary
    /// pattern; the case-insensitivity gives it wildcard behavior at the
    /// proxy). The credentials flag is always present so the proxy never
    /// falls back to its own default. List fields join with `,` preserving
    /// caller order and casing; empty lists stay absent.
    pub fn to_envoy(&self) -> Result<CorsPolicy> {
        self.validate()?;

        let allow_origin_string_match = self
            .allow_origin
            .iter()
            .map(|origin| {
                let mut matcher = StringMatcher {
                    ignore_case: true,
                    ..Default::default()
                };
                matcher.match_pattern = Some(MatchPattern::Exact(origin.clone()));
                matcher
            })
            .collect();

        Ok(CorsPolicy {
            allow_origin_string_match,
            allow_credentials: Some(BoolValue {
                value: self.allow_credentials,
            }),
            allow_methods: join_header_values(&self.allow_methods),
            allow_headers: join_header_values(&self.allow_headers),
            expose_headers: join_header_values(&self.expose_headers),
            max_age: self.max_age_field()?,
            ..Default::default()
        })
    }

    /// Translate and wrap as a typed `Any` for `typed_per_filter_config`.
    pub fn to_any(&self) -> Result<Any> {
        let policy = self.to_envoy()?;
        Ok(any_from_message(FILTER_CORS_POLICY_TYPE_URL, &policy))
    }

    /// Wire value for `max_age`: absent stays absent, zero is the literal
    /// `"0"` (explicitly disables preflight caching), positive durations emit
    /// whole seconds with sub-second remainders truncated toward zero, and
    /// negative durations fail translation.
    fn max_age_field(&self) -> Result<String> {
        let Some(text) = &self.max_age else {
            return Ok(String::new());
        };

        let nanos = parse_signed_duration(text)?;
        if nanos < 0 {
            return Err(invalid(format!("max_age must not be negative, got {text:?}")));
        }

        Ok((nanos / NANOS_PER_SECOND).to_string())
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::invalid_policy(msg.into())
}

fn join_header_values(values: &[String]) -> String {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn validate_header_name(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} entries cannot be empty")));
    }

    if value.trim() != "*" {
        HeaderName::from_bytes(value.trim().as_bytes())
            .map_err(|_| invalid(format!("invalid header name {value:?} in {field}")))?;
    }

    Ok(())
}

/// Parses a signed duration string in Go's `time.ParseDuration` grammar into
/// total nanoseconds: an optional sign followed by one or more components,
/// each a decimal number (optionally fractional) with a unit of `ns`, `us`
/// (or `µs`), `ms`, `s`, `m`, or `h`. `"0"` alone is accepted without a unit.
fn parse_signed_duration(input: &str) -> Result<i128> {
    let text = input.trim();

    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(stripped) => (true, stripped),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(invalid(format!("invalid duration {input:?}")));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let (component, remainder) = parse_duration_component(rest, input)?;
        total = total
            .checked_add(component)
            .ok_or_else(|| invalid(format!("duration {input:?} overflows")))?;
        rest = remainder;
    }

    Ok(if negative { -total } else { total })
}

/// Parses one `<number>[.<fraction>]<unit>` component, returning its value in
/// nanoseconds and the unparsed remainder.
fn parse_duration_component<'a>(text: &'a str, input: &str) -> Result<(i128, &'a str)> {
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let whole = &text[..digits_end];
    let mut rest = &text[digits_end..];

    let mut fraction = "";
    if let Some(after_dot) = rest.strip_prefix('.') {
        let frac_end = after_dot
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_dot.len());
        fraction = &after_dot[..frac_end];
        rest = &after_dot[frac_end..];
    }

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(format!("invalid duration {input:?}")));
    }

    let (unit_nanos, remainder) = parse_duration_unit(rest)
        .ok_or_else(|| invalid(format!("missing or unknown unit in duration {input:?}")))?;

    let whole_value: i128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| invalid(format!("invalid duration {input:?}")))?
    };

    let mut nanos = whole_value
        .checked_mul(unit_nanos)
        .ok_or_else(|| invalid(format!("duration {input:?} overflows")))?;

    if !fraction.is_empty() {
        // Digits beyond nanosecond precision cannot affect the result.
        let fraction = &fraction[..fraction.len().min(9)];
        let frac_value: i128 = fraction
            .parse()
            .map_err(|_| invalid(format!("invalid duration {input:?}")))?;
        let scale = 10_i128.pow(fraction.len() as u32);
        nanos += frac_value * unit_nanos / scale;
    }

    Ok((nanos, remainder))
}

fn parse_duration_unit(text: &str) -> Option<(i128, &str)> {
    // Two-character units must be tried before their one-character prefixes.
    const UNITS: &[(&str, i128)] = &[
        ("ns", 1),
        ("us", 1_000),
        ("µs", 1_000),
        ("μs", 1_000),
        ("ms", 1_000_000),
        ("s", NANOS_PER_SECOND),
        ("m", 60 * NANOS_PER_SECOND),
        ("h", 3_600 * NANOS_PER_SECOND),
    ];

    for (unit, nanos) in UNITS {
        if let Some(rest) = text.strip_prefix(unit) {
            return Some((*nanos, rest));
        }
    }
    None
}
