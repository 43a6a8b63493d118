//! Operator-facing rendering of reconciliation results.
//!
//! The diagnostic block lists the failing declarations next to the full
//! server state they were compared against, so a human can eyeball the
//! difference without re-querying the server.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::identity::{index_identity, name_type_identity, py_literal};
use crate::{FamilyOutcome, IndexOutcome, SpecFamily, SpecOutcome};

const DECORATION_WIDTH: usize = 80;

/// Render failed specs against the server specs they were compared with.
///
/// For the index family both values are mappings keyed by collection name
/// and the counts are collection counts; for views and analyzers both are
/// sequences of documents.
pub fn render_failed_vs_server(
    family: SpecFamily,
    failed_specs: &Value,
    server_specs: &Value,
) -> String {
    let dec = "*".repeat(DECORATION_WIDTH);
    let label = family.report_label();

    let mut out = String::new();
    out.push_str(&dec);
    out.push('\n');
    out.push_str(&format!(
        "----------> failed ({} {label}) ---------->\n",
        entry_count(failed_specs)
    ));
    out.push_str(&format!(
        "----------> names: {} ---------->\n",
        names_literal(family, failed_specs)
    ));
    out.push_str(&format_json(failed_specs));
    out.push('\n');
    out.push_str(&format!(
        "----------> server ({} {label}) ---------->\n",
        entry_count(server_specs)
    ));
    out.push_str(&format!(
        "----------> names: {} ---------->\n",
        names_literal(family, server_specs)
    ));
    out.push_str(&format_json(server_specs));
    out.push('\n');
    out.push_str(&dec);
    out
}

impl IndexOutcome {
    /// Diagnostic block, or `None` when every declared index matched.
    pub fn diagnostic(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        Some(render_failed_vs_server(
            self.family,
            &self.failed_specs.to_json(),
            &self.server,
        ))
    }
}

impl SpecOutcome {
    /// Diagnostic block, or `None` when every declared spec matched.
    pub fn diagnostic(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        Some(render_failed_vs_server(
            self.family,
            &Value::Array(self.failed_specs.clone()),
            &self.server,
        ))
    }
}

pub(crate) fn log_family_result<F>(
    outcome: &FamilyOutcome<F>,
    failed_json: &Value,
    verbose: bool,
) {
    let label = outcome.family.report_label();
    if outcome.is_clean() {
        info!("All {label} specs ensured");
    } else if !verbose {
        warn!(failed = ?outcome.failed, "{label} drift detected");
    } else {
        warn!(
            failed = outcome.failed.len(),
            "{label} drift detected\n{}",
            render_failed_vs_server(outcome.family, failed_json, &outcome.server)
        );
    }
}

/// Identity strings for every entry of a failed/server value.
pub fn names(family: SpecFamily, specs: &Value) -> Vec<String> {
    match (family, specs) {
        (SpecFamily::Collection, Value::Object(map)) => map
            .iter()
            .flat_map(|(coll, indexes)| {
                indexes
                    .as_array()
                    .map(|xs| {
                        xs.iter()
                            .map(|idx| index_identity(coll, idx))
                            .collect::<Vec<String>>()
                    })
                    .unwrap_or_default()
            })
            .collect(),
        (_, Value::Array(docs)) => docs.iter().map(name_type_identity).collect(),
        _ => Vec::new(),
    }
}

fn names_literal(family: SpecFamily, specs: &Value) -> String {
    let names: Vec<Value> = names(family, specs).into_iter().map(Value::String).collect();
    py_literal(&Value::Array(names))
}

fn entry_count(v: &Value) -> usize {
    match v {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    }
}

/// Pretty JSON with a four-space indent.
pub fn format_json(v: &Value) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if v.serialize(&mut ser).is_err() {
        return v.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| v.to_string())
}
