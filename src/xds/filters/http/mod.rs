//! HTTP filter configuration modules.

pub mod cors;

pub use cors::{CorsPolicyConfig, CORS_FILTER_NAME, FILTER_CORS_POLICY_TYPE_URL};
