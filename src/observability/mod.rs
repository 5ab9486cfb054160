//! # Observability
//!
//! Structured logging setup for hosts embedding the synthesis core.
//!
//! The core itself only emits `tracing` events (it performs no I/O); this
//! module gives embedding binaries a subscriber matching that output. Log
//! level comes from `RUST_LOG` when set, falling back to the provided default.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize a global tracing subscriber.
///
/// `default_level` is used when `RUST_LOG` is unset (e.g. `"info"`).
/// When `json` is true, events are emitted as structured JSON lines.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
