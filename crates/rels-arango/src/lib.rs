//! rels-arango
//!
//! Read-only ArangoDB HTTP client.
//!
//! Implements [`RemoteStateClient`] against the database's REST API. Every
//! call goes to the server; nothing is cached between fetches. This crate
//! never issues a write.

mod wire;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use rels_config::ensure::{DEFAULT_DB, DEFAULT_TIMEOUT_SECS, DEFAULT_USER};
use rels_config::EnsureConfig;
use rels_reconcile::{RemoteError, RemoteStateClient, SpecDocument};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use wire::{ArangoErrorBody, IndexList, NamedList, ResultList};

/// Keys ArangoDB adds to single-document responses that are not part of the
/// described object.
const ENVELOPE_KEYS: [&str; 2] = ["error", "code"];

/// Connection settings. The password is resolved by the caller; do not log it.
#[derive(Clone)]
pub struct ArangoSettings {
    pub url: String,
    pub db: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl ArangoSettings {
    pub fn new(url: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            db: DEFAULT_DB.to_string(),
            user: DEFAULT_USER.to_string(),
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_config(cfg: &EnsureConfig, password: impl Into<String>) -> Self {
        Self {
            url: cfg.arango_url.clone(),
            db: cfg.arango_db.clone(),
            user: cfg.arango_user.clone(),
            password: password.into(),
            timeout: cfg.timeout(),
        }
    }
}

impl std::fmt::Debug for ArangoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArangoSettings")
            .field("url", &self.url)
            .field("db", &self.db)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone)]
pub struct ArangoClient {
    http: Client,
    base_url: Url,
    db: String,
    user: String,
    password: String,
}

impl std::fmt::Debug for ArangoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArangoClient")
            .field("base_url", &self.base_url.as_str())
            .field("db", &self.db)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl ArangoClient {
    pub fn new(settings: ArangoSettings) -> Result<Self, RemoteError> {
        let base_url = Url::parse(settings.url.trim_end_matches('/')).map_err(|e| {
            RemoteError::Config(format!("invalid arango url '{}': {e}", settings.url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Config(format!(
                "arango url '{}' cannot be used as a base url",
                settings.url
            )));
        }
        if settings.db.trim().is_empty() {
            return Err(RemoteError::Config("arango db name is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RemoteError::Config(format!("http client build failed: {e}")))?;

        Ok(Self {
            http,
            base_url,
            db: settings.db,
            user: settings.user,
            password: settings.password,
        })
    }

    /// `{base}/_db/{db}/_api/{segments...}`, each segment percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Config("arango url cannot carry a path".to_string()))?;
            path.pop_if_empty().extend(["_db", self.db.as_str(), "_api"]);
            path.extend(segments);
        }
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<RequestBuilder, RemoteError> {
        let url = self.api_url(segments)?;
        Ok(self
            .http
            .get(url)
            .basic_auth(&self.user, Some(&self.password)))
    }

    fn fetch<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = req
            .send()
            .map_err(|e| RemoteError::Transport(format!("{what}: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| RemoteError::Transport(format!("{what}: reading body failed: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ArangoErrorBody>(&body)
                .ok()
                .and_then(|b| b.error_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(RemoteError::Api {
                code: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(format!("{what}: {e}")))
    }

    /// Server version document (`/_api/version`).
    pub fn server_version(&self) -> Result<Value, RemoteError> {
        let req = self.get(&["version"])?;
        self.fetch("server version", req)
    }

    /// Names of all non-system collections, in server order.
    pub fn list_collections(&self) -> Result<Vec<String>, RemoteError> {
        let req = self.get(&["collection"])?.query(&[("excludeSystem", "true")]);
        let body: NamedList = self.fetch("collection list", req)?;
        Ok(body.result.into_iter().map(|c| c.name).collect())
    }

    /// Live index documents of one collection.
    pub fn collection_indexes(&self, collection: &str) -> Result<Vec<SpecDocument>, RemoteError> {
        let req = self.get(&["index"])?.query(&[("collection", collection)]);
        let body: IndexList = self.fetch(&format!("indexes of '{collection}'"), req)?;
        Ok(body.indexes)
    }

    /// Full property document of one view.
    pub fn view_properties(&self, name: &str) -> Result<SpecDocument, RemoteError> {
        let req = self.get(&["view", name, "properties"])?;
        let mut doc: Value = self.fetch(&format!("properties of view '{name}'"), req)?;
        strip_envelope(&mut doc);
        Ok(doc)
    }
}

fn strip_envelope(doc: &mut Value) {
    if let Some(map) = doc.as_object_mut() {
        for key in ENVELOPE_KEYS {
            map.remove(key);
        }
    }
}

impl RemoteStateClient for ArangoClient {
    fn get_all_indexes(&self) -> Result<BTreeMap<String, Vec<SpecDocument>>, RemoteError> {
        let mut out = BTreeMap::new();
        for name in self.list_collections()? {
            let indexes = self.collection_indexes(&name)?;
            debug!(collection = %name, count = indexes.len(), "fetched live indexes");
            if !indexes.is_empty() {
                out.insert(name, indexes);
            }
        }
        Ok(out)
    }

    fn get_all_views(&self) -> Result<Vec<SpecDocument>, RemoteError> {
        let req = self.get(&["view"])?;
        let listed: NamedList = self.fetch("view list", req)?;
        let mut out = Vec::with_capacity(listed.result.len());
        for view in listed.result {
            out.push(self.view_properties(&view.name)?);
        }
        debug!(count = out.len(), "fetched live views");
        Ok(out)
    }

    fn get_all_analyzers(&self) -> Result<Vec<SpecDocument>, RemoteError> {
        let req = self.get(&["analyzer"])?;
        let body: ResultList = self.fetch("analyzer list", req)?;
        debug!(count = body.result.len(), "fetched live analyzers");
        Ok(body.result)
    }
}
