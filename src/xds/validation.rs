//! Validity reporting boundary.
//!
//! Synthesis produces one pass/fail outcome per configuration unit (a virtual
//! host and its policy). The reporter is an external collaborator: it persists
//! a status condition on the owning source object, while the synthesizer
//! enforces the fail-closed side locally by dropping the unit's routes. The
//! core performs no status I/O of its own.

use tracing::{debug, warn};

/// Receives per-unit validity outcomes during a synthesis pass.
///
/// Implementations must not fail: a reporting problem must never abort the
/// processing of sibling units.
pub trait ValidityReporter {
    /// The unit translated cleanly and is included in the emitted resources.
    fn report_valid(&self, unit: &str);

    /// The unit failed translation and is excluded in its entirety.
    fn report_invalid(&self, unit: &str, reason: &str);
}

/// Reporter that only emits structured log events. Useful as a default for
/// embedders that persist status elsewhere, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ValidityReporter for LogReporter {
    fn report_valid(&self, unit: &str) {
        debug!(unit, "configuration unit valid");
    }

    fn report_invalid(&self, unit: &str, reason: &str) {
        warn!(unit, reason, "configuration unit invalid, dropping its routes");
    }
}
