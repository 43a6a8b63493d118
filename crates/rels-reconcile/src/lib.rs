//! rels-reconcile
//!
//! Declarative-state reconciliation for graph-database schema specs.
//!
//! Compares declared collection indexes, views and analyzers against the
//! live configuration reported by the server and reports which declared
//! specs have no satisfying live counterpart.
//!
//! - Declared specs are ground truth and are never modified.
//! - Live snapshots are fetched fresh per family run and normalized before
//!   comparison (float rounding for views, namespace excision for analyzers).
//! - Matching is one-directional containment: live documents may carry
//!   extra keys.
//! - Drift is data, not an error. Collaborator errors propagate unchanged.
//!
//! Read-only. Nothing here creates, alters or deletes server state.

mod engine;
pub mod gate;
pub mod identity;
pub mod matcher;
pub mod normalize;
pub mod report;
pub mod source;
mod types;

pub use engine::{
    collect_local_indexes, index_identities, named_identities, reconcile_index_state,
    reconcile_named_state, validate_named_specs, CollectionIndexes, ReconcileError, Reconciler,
};
pub use gate::{check_conformance, ConformanceGate};
pub use matcher::{is_satisfied, Matcher};
pub use source::{LocalSpecProvider, RemoteError, RemoteStateClient, SpecSourceError};
pub use types::*;
