//! # Error Handling
//!
//! Error types for the synthesis core, defined with `thiserror`.
//!
//! [`Error::InvalidPolicy`] is deliberately a single outcome per configuration
//! unit rather than a per-field accumulation: an invalid policy invalidates
//! the whole owning unit, and callers drop that unit in its entirety.

/// Custom result type for synthesis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the synthesis core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed synthesis input (bad DTO shape, empty required fields)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal, per-unit policy rejection. Never retried; the owning
    /// configuration unit is excluded from the emitted resource set.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid-policy outcome
    pub fn invalid_policy<S: Into<String>>(message: S) -> Self {
        Self::InvalidPolicy(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = Error::invalid_policy("negative max age");
        assert_eq!(err.to_string(), "Invalid policy: negative max age");

        let err = Error::config("route configuration requires a name");
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
