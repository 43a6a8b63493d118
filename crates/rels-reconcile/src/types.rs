use serde::Serialize;
use serde_json::Value;

/// One declared (or live) configuration unit: an index, a view or an analyzer.
///
/// Kept as a plain JSON tree. Server documents carry arbitrary extra keys
/// and the declared side is free-form beyond its identity fields, so a typed
/// struct per family would throw away exactly the data being compared.
pub type SpecDocument = Value;

/// The three spec categories, each with its own identity scheme and pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecFamily {
    /// Collection declarations; only those carrying `indexes` take part.
    Collection,
    View,
    Analyzer,
}

impl SpecFamily {
    /// Sub-directory name used by spec repositories.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SpecFamily::Collection => "collections",
            SpecFamily::View => "views",
            SpecFamily::Analyzer => "analyzers",
        }
    }

    /// Label used in summaries and diagnostics for what gets compared.
    pub fn report_label(&self) -> &'static str {
        match self {
            SpecFamily::Collection => "indexes",
            SpecFamily::View => "views",
            SpecFamily::Analyzer => "analyzers",
        }
    }
}

impl std::fmt::Display for SpecFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecFamily::Collection => write!(f, "collection"),
            SpecFamily::View => write!(f, "view"),
            SpecFamily::Analyzer => write!(f, "analyzer"),
        }
    }
}

/// A declared document plus where it was loaded from.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalSpec {
    /// Originating declaration (usually a file path). Diagnostics only.
    pub origin: String,
    pub doc: SpecDocument,
}

impl LocalSpec {
    pub fn new(origin: impl Into<String>, doc: SpecDocument) -> Self {
        Self {
            origin: origin.into(),
            doc,
        }
    }
}

/// Declared indexes of one collection that found no satisfying live index.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionFailures {
    pub collection: String,
    pub origin: String,
    /// Failing index documents, in declaration order.
    pub indexes: Vec<SpecDocument>,
}

/// Index-family failure report. Collections appear in load order and
/// only when they have at least one failing index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexFailures {
    pub collections: Vec<CollectionFailures>,
}

impl IndexFailures {
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Total failing indexes across all collections.
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }

    /// `{collection: [index, ...]}` in report order.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for c in &self.collections {
            map.insert(c.collection.clone(), Value::Array(c.indexes.clone()));
        }
        Value::Object(map)
    }
}

/// Result of one family run.
///
/// `failed` holds stable identity strings; `failed_specs` the full failing
/// declarations; `server` the normalized remote snapshot the comparison ran
/// against (kept for diagnostics, dropped with the outcome).
#[derive(Clone, Debug, PartialEq)]
pub struct FamilyOutcome<F> {
    pub family: SpecFamily,
    pub failed: Vec<String>,
    pub failed_specs: F,
    pub server: Value,
}

impl<F> FamilyOutcome<F> {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of the index family.
pub type IndexOutcome = FamilyOutcome<IndexFailures>;

/// Outcome of the view or analyzer family.
pub type SpecOutcome = FamilyOutcome<Vec<SpecDocument>>;

/// Aggregated failure identities, one list per family.
///
/// Field order is the serialization order: `indexes`, `views`, `analyzers`.
/// Empty lists everywhere means the server fully conforms.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnsureSummary {
    pub indexes: Vec<String>,
    pub views: Vec<String>,
    pub analyzers: Vec<String>,
}

impl EnsureSummary {
    pub fn is_clean(&self) -> bool {
        self.indexes.is_empty() && self.views.is_empty() && self.analyzers.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.indexes.len() + self.views.len() + self.analyzers.len()
    }

    /// `(family label, identities)` pairs in summary order.
    pub fn families(&self) -> [(&'static str, &[String]); 3] {
        [
            ("indexes", self.indexes.as_slice()),
            ("views", self.views.as_slice()),
            ("analyzers", self.analyzers.as_slice()),
        ]
    }
}
