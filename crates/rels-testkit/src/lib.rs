//! In-memory collaborators and document builders for scenario tests.
//!
//! `StaticSpecs` stands in for a spec repository, `StaticServer` for a live
//! database. Both are single-threaded and deterministic.

use std::cell::Cell;
use std::collections::BTreeMap;

use rels_reconcile::{
    LocalSpec, LocalSpecProvider, RemoteError, RemoteStateClient, SpecDocument, SpecFamily,
    SpecSourceError,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Declared side
// ---------------------------------------------------------------------------

/// Declared specs held in memory, returned in insertion order.
#[derive(Debug, Default, Clone)]
pub struct StaticSpecs {
    collections: Vec<LocalSpec>,
    views: Vec<LocalSpec>,
    analyzers: Vec<LocalSpec>,
    fail_with: Option<SpecSourceError>,
}

impl StaticSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, doc: Value) -> Self {
        let origin = origin_for(SpecFamily::Collection, &doc, self.collections.len());
        self.collections.push(LocalSpec::new(origin, doc));
        self
    }

    pub fn with_view(mut self, doc: Value) -> Self {
        let origin = origin_for(SpecFamily::View, &doc, self.views.len());
        self.views.push(LocalSpec::new(origin, doc));
        self
    }

    pub fn with_analyzer(mut self, doc: Value) -> Self {
        let origin = origin_for(SpecFamily::Analyzer, &doc, self.analyzers.len());
        self.analyzers.push(LocalSpec::new(origin, doc));
        self
    }

    /// Make every `list_specs` call fail with `err`.
    pub fn failing(mut self, err: SpecSourceError) -> Self {
        self.fail_with = Some(err);
        self
    }
}

fn origin_for(family: SpecFamily, doc: &Value, n: usize) -> String {
    let stem = doc
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unnamed_{n}"));
    format!("mem://{}/{}.json", family.dir_name(), stem)
}

impl LocalSpecProvider for StaticSpecs {
    fn describe(&self) -> String {
        "in-memory specs".to_string()
    }

    fn list_specs(&self, family: SpecFamily) -> Result<Vec<LocalSpec>, SpecSourceError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(match family {
            SpecFamily::Collection => self.collections.clone(),
            SpecFamily::View => self.views.clone(),
            SpecFamily::Analyzer => self.analyzers.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Live side
// ---------------------------------------------------------------------------

/// Live server state held in memory.
///
/// Every getter hands out a fresh clone, so callers may mutate what they get
/// without affecting later fetches. Fetches are counted per family.
#[derive(Debug, Default)]
pub struct StaticServer {
    indexes: BTreeMap<String, Vec<SpecDocument>>,
    views: Vec<SpecDocument>,
    analyzers: Vec<SpecDocument>,
    fail_indexes: Option<RemoteError>,
    fail_views: Option<RemoteError>,
    fail_analyzers: Option<RemoteError>,
    index_fetches: Cell<usize>,
    view_fetches: Cell<usize>,
    analyzer_fetches: Cell<usize>,
}

impl StaticServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register live indexes for a collection. An empty list is treated the
    /// way a real client reports it: the collection is left out entirely.
    pub fn with_indexes(mut self, collection: &str, indexes: Vec<Value>) -> Self {
        if !indexes.is_empty() {
            self.indexes.insert(collection.to_string(), indexes);
        }
        self
    }

    pub fn with_view(mut self, doc: Value) -> Self {
        self.views.push(doc);
        self
    }

    pub fn with_analyzer(mut self, doc: Value) -> Self {
        self.analyzers.push(doc);
        self
    }

    pub fn failing_indexes(mut self, err: RemoteError) -> Self {
        self.fail_indexes = Some(err);
        self
    }

    pub fn failing_views(mut self, err: RemoteError) -> Self {
        self.fail_views = Some(err);
        self
    }

    pub fn failing_analyzers(mut self, err: RemoteError) -> Self {
        self.fail_analyzers = Some(err);
        self
    }

    /// `(indexes, views, analyzers)` fetch counts so far.
    pub fn fetch_counts(&self) -> (usize, usize, usize) {
        (
            self.index_fetches.get(),
            self.view_fetches.get(),
            self.analyzer_fetches.get(),
        )
    }

    /// Unnormalized live analyzers, as the server would report them.
    pub fn analyzers(&self) -> &[SpecDocument] {
        &self.analyzers
    }
}

fn bump(c: &Cell<usize>) {
    c.set(c.get() + 1);
}

impl RemoteStateClient for StaticServer {
    fn get_all_indexes(&self) -> Result<BTreeMap<String, Vec<SpecDocument>>, RemoteError> {
        bump(&self.index_fetches);
        match &self.fail_indexes {
            Some(err) => Err(err.clone()),
            None => Ok(self.indexes.clone()),
        }
    }

    fn get_all_views(&self) -> Result<Vec<SpecDocument>, RemoteError> {
        bump(&self.view_fetches);
        match &self.fail_views {
            Some(err) => Err(err.clone()),
            None => Ok(self.views.clone()),
        }
    }

    fn get_all_analyzers(&self) -> Result<Vec<SpecDocument>, RemoteError> {
        bump(&self.analyzer_fetches);
        match &self.fail_analyzers {
            Some(err) => Err(err.clone()),
            None => Ok(self.analyzers.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// `{"type": .., "fields": [..]}`
pub fn index(index_type: &str, fields: &[&str]) -> Value {
    json!({"type": index_type, "fields": fields})
}

/// Index as the server reports it: the declared pair plus server-side keys.
pub fn live_index(collection: &str, id: u64, index_type: &str, fields: &[&str]) -> Value {
    json!({
        "id": format!("{collection}/{id}"),
        "type": index_type,
        "fields": fields,
        "sparse": false,
        "unique": false,
    })
}

/// Collection declaration carrying `indexes`.
pub fn collection(name: &str, indexes: Vec<Value>) -> Value {
    json!({"name": name, "type": "document", "indexes": indexes})
}

/// `{"name": .., "type": ..}`
pub fn named(name: &str, spec_type: &str) -> Value {
    json!({"name": name, "type": spec_type})
}

/// Convenience: a remote error that looks like an auth failure.
pub fn unauthorized() -> RemoteError {
    RemoteError::Api {
        code: Some(401),
        message: "not authorized to execute this request".to_string(),
    }
}
