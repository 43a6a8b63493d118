//! Response shapes of the REST endpoints the client reads.

use serde::Deserialize;
use serde_json::Value;

/// Error body ArangoDB sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ArangoErrorBody {
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedEntry {
    pub name: String,
}

/// `{"result": [{"name": ..}, ..]}` (collection and view listings).
#[derive(Debug, Deserialize)]
pub(crate) struct NamedList {
    pub result: Vec<NamedEntry>,
}

/// `{"result": [...]}` with full documents (analyzer listing).
#[derive(Debug, Deserialize)]
pub(crate) struct ResultList {
    pub result: Vec<Value>,
}

/// `{"indexes": [...]}`
#[derive(Debug, Deserialize)]
pub(crate) struct IndexList {
    pub indexes: Vec<Value>,
}
