//! Conformance gate.
//!
//! The engine only detects drift. Whether drift blocks a workflow (a
//! deployment, a CI stage, a health check) is the caller's decision; this
//! module gives that decision a single, explicit surface.
//!
//! Pure and deterministic: no IO.

use crate::EnsureSummary;

/// Result of a conformance check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConformanceGate {
    /// Every declared spec is satisfied on the server.
    Conformant,
    /// At least one declared spec is missing or mismatched.
    ///
    /// The embedded summary carries the failure identities for logging.
    Drifted { summary: EnsureSummary },
}

impl ConformanceGate {
    /// `true` when the workflow may proceed.
    pub fn is_conformant(&self) -> bool {
        matches!(self, ConformanceGate::Conformant)
    }

    /// `true` when drift was detected.
    pub fn is_drifted(&self) -> bool {
        !self.is_conformant()
    }
}

/// Map a summary to a gate decision.
pub fn check_conformance(summary: &EnsureSummary) -> ConformanceGate {
    if summary.is_clean() {
        ConformanceGate::Conformant
    } else {
        ConformanceGate::Drifted {
            summary: summary.clone(),
        }
    }
}
