use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use crate::identity::{index_identity, name_type_identity};
use crate::matcher::Matcher;
use crate::normalize::{excise_namespaces, round_floats, ROUND_PLACES};
use crate::report::log_family_result;
use crate::source::{LocalSpecProvider, RemoteError, RemoteStateClient, SpecSourceError};
use crate::{
    CollectionFailures, EnsureSummary, IndexFailures, IndexOutcome, LocalSpec, SpecDocument,
    SpecFamily, SpecOutcome,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that stops a reconciliation run.
///
/// A mismatch is not an error; it is a failure entry in the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The local spec provider failed.
    Source(SpecSourceError),
    /// The remote state client failed. Passed through untouched.
    Remote(RemoteError),
    /// A declaration lacks a field its identity is built from.
    MalformedSpec { origin: String, reason: String },
    /// Two declarations claim the same collection.
    DuplicateCollection {
        name: String,
        first: String,
        second: String,
    },
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Source(e) => write!(f, "{e}"),
            ReconcileError::Remote(e) => write!(f, "{e}"),
            ReconcileError::MalformedSpec { origin, reason } => {
                write!(f, "malformed spec '{origin}': {reason}")
            }
            ReconcileError::DuplicateCollection {
                name,
                first,
                second,
            } => write!(
                f,
                "collection '{name}' is declared twice: '{first}' and '{second}'"
            ),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Source(e) => Some(e),
            ReconcileError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpecSourceError> for ReconcileError {
    fn from(e: SpecSourceError) -> Self {
        ReconcileError::Source(e)
    }
}

impl From<RemoteError> for ReconcileError {
    fn from(e: RemoteError) -> Self {
        ReconcileError::Remote(e)
    }
}

fn malformed(origin: &str, reason: impl Into<String>) -> ReconcileError {
    ReconcileError::MalformedSpec {
        origin: origin.to_string(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Local declarations
// ---------------------------------------------------------------------------

/// A collection declaration that defines indexes.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionIndexes {
    pub name: String,
    pub origin: String,
    pub indexes: Vec<SpecDocument>,
}

/// Pull `(name, indexes)` out of every collection declaration that has
/// `indexes`, in load order. Declarations without `indexes` are skipped.
pub fn collect_local_indexes(
    specs: Vec<LocalSpec>,
) -> Result<Vec<CollectionIndexes>, ReconcileError> {
    let mut out: Vec<CollectionIndexes> = Vec::new();

    for spec in specs {
        let Some(indexes) = spec.doc.get("indexes") else {
            continue;
        };
        let name = spec
            .doc
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(&spec.origin, "collection has no string 'name'"))?;
        let indexes = indexes
            .as_array()
            .ok_or_else(|| malformed(&spec.origin, "'indexes' is not a sequence"))?;

        for (i, index) in indexes.iter().enumerate() {
            if !index.is_object() {
                return Err(malformed(&spec.origin, format!("index #{i} is not a mapping")));
            }
            for field in ["type", "fields"] {
                if index.get(field).is_none() {
                    return Err(malformed(
                        &spec.origin,
                        format!("index #{i} has no '{field}'"),
                    ));
                }
            }
        }

        if let Some(prev) = out.iter().find(|c| c.name == name) {
            return Err(ReconcileError::DuplicateCollection {
                name: name.to_string(),
                first: prev.origin.clone(),
                second: spec.origin.clone(),
            });
        }

        out.push(CollectionIndexes {
            name: name.to_string(),
            origin: spec.origin.clone(),
            indexes: indexes.clone(),
        });
    }

    Ok(out)
}

/// Check that every view/analyzer declaration carries its identity fields.
pub fn validate_named_specs(specs: &[LocalSpec]) -> Result<(), ReconcileError> {
    for spec in specs {
        if !spec.doc.is_object() {
            return Err(malformed(&spec.origin, "spec is not a mapping"));
        }
        for field in ["name", "type"] {
            if spec.doc.get(field).is_none() {
                return Err(malformed(&spec.origin, format!("spec has no '{field}'")));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Family pipelines
// ---------------------------------------------------------------------------

/// Match every declared index against the live indexes of its collection.
///
/// A collection unknown to the server fails all of its indexes. Every
/// unsatisfied index is kept; collections without failures are dropped.
pub fn reconcile_index_state(
    local: &[CollectionIndexes],
    remote: &BTreeMap<String, Vec<SpecDocument>>,
) -> IndexFailures {
    let matcher = Matcher::exact();
    let mut collections: Vec<CollectionFailures> = Vec::new();

    for coll in local {
        info!(collection = %coll.name, origin = %coll.origin, "ensuring indexes");

        let failed: Vec<SpecDocument> = match remote.get(&coll.name) {
            None => coll.indexes.clone(),
            Some(live) => coll
                .indexes
                .iter()
                .filter(|idx| !matcher.is_satisfied(idx, live))
                .cloned()
                .collect(),
        };

        if !failed.is_empty() {
            collections.push(CollectionFailures {
                collection: coll.name.clone(),
                origin: coll.origin.clone(),
                indexes: failed,
            });
        }
    }

    IndexFailures { collections }
}

/// Match every declared spec against the whole live pool.
pub fn reconcile_named_state(
    family: SpecFamily,
    local: &[LocalSpec],
    remote: &[SpecDocument],
    matcher: Matcher,
) -> Vec<SpecDocument> {
    let mut failed: Vec<SpecDocument> = Vec::new();
    for spec in local {
        info!(origin = %spec.origin, "ensuring {family}");
        if !matcher.is_satisfied(&spec.doc, remote) {
            failed.push(spec.doc.clone());
        }
    }
    failed
}

/// Identities of failed indexes, collection by collection.
pub fn index_identities(failures: &IndexFailures) -> Vec<String> {
    failures
        .collections
        .iter()
        .flat_map(|c| c.indexes.iter().map(|idx| index_identity(&c.collection, idx)))
        .collect()
}

/// Identities of failed views or analyzers.
pub fn named_identities(failed: &[SpecDocument]) -> Vec<String> {
    failed.iter().map(name_type_identity).collect()
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// One reconciliation context: a declared-spec source and a live-state
/// source. Holds no state of its own; every method call fetches a fresh
/// remote snapshot that lives only as long as that call.
pub struct Reconciler<'a> {
    local: &'a dyn LocalSpecProvider,
    remote: &'a dyn RemoteStateClient,
    verbose: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(local: &'a dyn LocalSpecProvider, remote: &'a dyn RemoteStateClient) -> Self {
        Self {
            local,
            remote,
            verbose: true,
        }
    }

    /// With `false`, drift is logged as identities only, without the
    /// failed-vs-server block.
    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    /// Index family: no normalization, per-collection pools.
    pub fn reconcile_indexes(&self) -> Result<IndexOutcome, ReconcileError> {
        let local = collect_local_indexes(self.local.list_specs(SpecFamily::Collection)?)?;
        let remote = self.remote.get_all_indexes()?;

        let failures = reconcile_index_state(&local, &remote);
        let server = index_snapshot_json(remote);

        let outcome = IndexOutcome {
            family: SpecFamily::Collection,
            failed: index_identities(&failures),
            failed_specs: failures,
            server,
        };
        log_family_result(&outcome, &outcome.failed_specs.to_json(), self.verbose);
        Ok(outcome)
    }

    /// View family: float leaves of the live views are rounded first.
    pub fn reconcile_views(&self) -> Result<SpecOutcome, ReconcileError> {
        let mut remote = self.remote.get_all_views()?;
        round_floats(&mut remote);

        let local = self.local.list_specs(SpecFamily::View)?;
        validate_named_specs(&local)?;

        let failed = reconcile_named_state(
            SpecFamily::View,
            &local,
            &remote,
            Matcher::rounded(ROUND_PLACES),
        );
        Ok(named_outcome(SpecFamily::View, failed, remote, self.verbose))
    }

    /// Analyzer family: namespaces are cut from every live string leaf first.
    pub fn reconcile_analyzers(&self) -> Result<SpecOutcome, ReconcileError> {
        let mut remote = self.remote.get_all_analyzers()?;
        excise_namespaces(&mut remote);

        let local = self.local.list_specs(SpecFamily::Analyzer)?;
        validate_named_specs(&local)?;

        let failed =
            reconcile_named_state(SpecFamily::Analyzer, &local, &remote, Matcher::exact());
        Ok(named_outcome(SpecFamily::Analyzer, failed, remote, self.verbose))
    }

    /// All three families in fixed order: indexes, views, analyzers.
    ///
    /// Drift in one family never skips another. Errors stop the run.
    pub fn reconcile_all(&self) -> Result<EnsureSummary, ReconcileError> {
        info!(specs = %self.local.describe(), "reconciling all families");
        let indexes = self.reconcile_indexes()?;
        let views = self.reconcile_views()?;
        let analyzers = self.reconcile_analyzers()?;

        Ok(EnsureSummary {
            indexes: indexes.failed,
            views: views.failed,
            analyzers: analyzers.failed,
        })
    }
}

fn named_outcome(
    family: SpecFamily,
    failed_specs: Vec<SpecDocument>,
    remote: Vec<SpecDocument>,
    verbose: bool,
) -> SpecOutcome {
    let outcome = SpecOutcome {
        family,
        failed: named_identities(&failed_specs),
        server: Value::Array(remote),
        failed_specs,
    };
    log_family_result(&outcome, &Value::Array(outcome.failed_specs.clone()), verbose);
    outcome
}

fn index_snapshot_json(remote: BTreeMap<String, Vec<SpecDocument>>) -> Value {
    let mut map = serde_json::Map::new();
    for (name, indexes) in remote {
        map.insert(name, Value::Array(indexes));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coll(origin: &str, doc: Value) -> LocalSpec {
        LocalSpec::new(origin, doc)
    }

    #[test]
    fn collections_without_indexes_are_skipped() {
        let specs = vec![
            coll("a.yaml", json!({"name": "a"})),
            coll("b.yaml", json!({"name": "b", "indexes": []})),
        ];
        let local = collect_local_indexes(specs).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].name, "b");
        assert_eq!(local[0].origin, "b.yaml");
    }

    #[test]
    fn collection_without_name_is_malformed() {
        let specs = vec![coll("x.yaml", json!({"indexes": []}))];
        let err = collect_local_indexes(specs).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedSpec { ref origin, .. } if origin == "x.yaml"));
    }

    #[test]
    fn index_without_fields_is_malformed() {
        let specs = vec![coll(
            "x.yaml",
            json!({"name": "x", "indexes": [{"type": "persistent"}]}),
        )];
        let err = collect_local_indexes(specs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed spec 'x.yaml': index #0 has no 'fields'"
        );
    }

    #[test]
    fn duplicate_collection_is_rejected() {
        let specs = vec![
            coll("one.yaml", json!({"name": "x", "indexes": []})),
            coll("two.yaml", json!({"name": "x", "indexes": []})),
        ];
        let err = collect_local_indexes(specs).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateCollection {
                name: "x".to_string(),
                first: "one.yaml".to_string(),
                second: "two.yaml".to_string(),
            }
        );
    }

    #[test]
    fn every_failing_index_in_a_collection_is_kept() {
        let local = vec![CollectionIndexes {
            name: "taxa".to_string(),
            origin: "taxa.yaml".to_string(),
            indexes: vec![
                json!({"type": "persistent", "fields": ["id"]}),
                json!({"type": "persistent", "fields": ["scientific_name"]}),
                json!({"type": "fulltext", "fields": ["name"]}),
            ],
        }];
        let mut remote = BTreeMap::new();
        remote.insert(
            "taxa".to_string(),
            vec![json!({"type": "persistent", "fields": ["id"], "id": "taxa/1"})],
        );

        let failures = reconcile_index_state(&local, &remote);
        assert_eq!(failures.collections.len(), 1);
        assert_eq!(failures.index_count(), 2);
        assert_eq!(
            index_identities(&failures),
            vec![
                "taxa/persistent/['scientific_name']".to_string(),
                "taxa/fulltext/['name']".to_string(),
            ]
        );
    }

    #[test]
    fn clean_collections_are_filtered_out() {
        let local = vec![
            CollectionIndexes {
                name: "ok".to_string(),
                origin: "ok.yaml".to_string(),
                indexes: vec![json!({"type": "hash", "fields": ["k"]})],
            },
            CollectionIndexes {
                name: "gone".to_string(),
                origin: "gone.yaml".to_string(),
                indexes: vec![json!({"type": "hash", "fields": ["k"]})],
            },
        ];
        let mut remote = BTreeMap::new();
        remote.insert("ok".to_string(), vec![json!({"type": "hash", "fields": ["k"]})]);

        let failures = reconcile_index_state(&local, &remote);
        let names: Vec<&str> = failures
            .collections
            .iter()
            .map(|c| c.collection.as_str())
            .collect();
        assert_eq!(names, vec!["gone"]);
    }

    #[test]
    fn named_spec_without_type_is_malformed() {
        let specs = vec![coll("v.json", json!({"name": "v"}))];
        assert!(matches!(
            validate_named_specs(&specs),
            Err(ReconcileError::MalformedSpec { .. })
        ));
    }

    #[test]
    fn reconcile_error_display_passes_remote_through() {
        let err: ReconcileError = RemoteError::Transport("connection refused".to_string()).into();
        assert_eq!(err.to_string(), "transport error: connection refused");
    }
}
