//! Collaborator boundary: where declared and live specs come from.
//!
//! This module defines **only** the two collaborator traits and their error
//! types. Concrete providers live in `rels-specs` (filesystem) and
//! `rels-arango` (HTTP); in-memory fakes live in `rels-testkit`.

use std::collections::BTreeMap;
use std::fmt;

use crate::{LocalSpec, SpecDocument, SpecFamily};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a [`LocalSpecProvider`] may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSourceError {
    /// A declaration (or its directory) could not be read.
    Io { origin: String, message: String },
    /// A declaration could not be parsed as JSON/YAML.
    Parse { origin: String, message: String },
    /// A declaration parsed, but its top level is not a mapping.
    NotAnObject { origin: String },
}

impl fmt::Display for SpecSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecSourceError::Io { origin, message } => {
                write!(f, "failed to read spec '{origin}': {message}")
            }
            SpecSourceError::Parse { origin, message } => {
                write!(f, "failed to parse spec '{origin}': {message}")
            }
            SpecSourceError::NotAnObject { origin } => {
                write!(f, "spec '{origin}' is not a mapping at the top level")
            }
        }
    }
}

impl std::error::Error for SpecSourceError {}

/// Errors a [`RemoteStateClient`] may return.
///
/// The engine never catches these; they surface to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or transport failure (connection refused, timeout, TLS...).
    Transport(String),
    /// The server answered with a non-success status.
    Api { code: Option<u16>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Client-side configuration is missing or invalid (e.g. no password).
    Config(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Transport(msg) => write!(f, "transport error: {msg}"),
            RemoteError::Api {
                code: Some(c),
                message,
            } => write!(f, "server error code={c}: {message}"),
            RemoteError::Api {
                code: None,
                message,
            } => write!(f, "server error: {message}"),
            RemoteError::Decode(msg) => write!(f, "decode error: {msg}"),
            RemoteError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Source of declared (desired-state) specs.
///
/// Implementations return documents in a stable order; the engine reports
/// failures in that order.
pub trait LocalSpecProvider {
    /// Human-readable name for logs (e.g. the spec root path).
    fn describe(&self) -> String;

    fn list_specs(&self, family: SpecFamily) -> Result<Vec<LocalSpec>, SpecSourceError>;
}

/// Source of live (actual-state) specs.
///
/// Every call must fetch fresh state; the engine relies on never seeing a
/// cached snapshot.
pub trait RemoteStateClient {
    /// Collection name to live index documents. Collections for which the
    /// server reports no indexes are omitted from the map.
    fn get_all_indexes(&self) -> Result<BTreeMap<String, Vec<SpecDocument>>, RemoteError>;

    fn get_all_views(&self) -> Result<Vec<SpecDocument>, RemoteError>;

    fn get_all_analyzers(&self) -> Result<Vec<SpecDocument>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_api_with_code() {
        let err = RemoteError::Api {
            code: Some(401),
            message: "not authorized to execute this request".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "server error code=401: not authorized to execute this request"
        );
    }

    #[test]
    fn remote_error_display_transport() {
        let err = RemoteError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn spec_source_error_display_names_origin() {
        let err = SpecSourceError::NotAnObject {
            origin: "spec/views/Taxa.json".to_string(),
        };
        assert!(err.to_string().contains("spec/views/Taxa.json"));
    }
}
