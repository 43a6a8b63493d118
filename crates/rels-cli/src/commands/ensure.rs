//! `rels ensure`: load config, open the spec tree, connect, reconcile, print.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rels_arango::{ArangoClient, ArangoSettings};
use rels_config::{report_unused_keys, resolve_arango_password, EnsureConfig, UnusedKeyPolicy};
use rels_reconcile::{check_conformance, ConformanceGate, EnsureSummary, Reconciler};
use rels_specs::SpecRepository;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Exit status for a completed run that found drift under `--fail-on-drift`.
pub const EXIT_DRIFT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    All,
    Indexes,
    Views,
    Analyzers,
}

impl FamilyArg {
    /// Summary keys this selection reports.
    fn labels(self) -> &'static [&'static str] {
        match self {
            FamilyArg::All => &["indexes", "views", "analyzers"],
            FamilyArg::Indexes => &["indexes"],
            FamilyArg::Views => &["views"],
            FamilyArg::Analyzers => &["analyzers"],
        }
    }
}

#[derive(Debug)]
pub struct EnsureArgs {
    pub family: FamilyArg,
    pub config_paths: Vec<PathBuf>,
    pub spec_root: Option<PathBuf>,
    pub fail_on_drift: bool,
    pub strict_config: bool,
}

pub fn run(args: EnsureArgs) -> Result<ExitCode> {
    let loaded = rels_config::load_layered_yaml(&args.config_paths)?;

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = report_unused_keys(&loaded.config_json, policy)?;
    if !unused.is_clean() {
        warn!(unused = ?unused.unused_leaf_pointers, "config carries keys nothing reads");
    }

    let cfg = EnsureConfig::from_config_json(&loaded.config_json)?;
    let spec_root = args.spec_root.unwrap_or_else(|| cfg.spec_root.clone());

    info!(
        config_hash = %loaded.config_hash,
        url = %cfg.arango_url,
        db = %cfg.arango_db,
        spec_root = %spec_root.display(),
        "ensure starting"
    );

    let repo = SpecRepository::open(&spec_root).context("spec root unusable")?;

    let password = resolve_arango_password(&cfg)?;
    let client = ArangoClient::new(ArangoSettings::from_config(&cfg, password.into_inner()))
        .context("arango client setup failed")?;

    let version = client
        .server_version()
        .with_context(|| format!("arango preflight failed ({})", cfg.arango_url))?;
    info!(
        version = version.get("version").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
        "connected"
    );

    let reconciler = Reconciler::new(&repo, &client).verbose(cfg.verbose);
    let summary = reconcile(&reconciler, args.family)?;

    println!("{}", serde_json::to_string_pretty(&summary_json(&summary, args.family))?);

    match check_conformance(&summary) {
        ConformanceGate::Conformant => {
            info!("server conforms to declared specs");
            Ok(ExitCode::SUCCESS)
        }
        ConformanceGate::Drifted { summary } => {
            warn!(failures = summary.failure_count(), "server drifted from declared specs");
            if args.fail_on_drift {
                Ok(ExitCode::from(EXIT_DRIFT))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn reconcile(reconciler: &Reconciler<'_>, family: FamilyArg) -> Result<EnsureSummary> {
    let summary = match family {
        FamilyArg::All => reconciler.reconcile_all()?,
        FamilyArg::Indexes => EnsureSummary {
            indexes: reconciler.reconcile_indexes()?.failed,
            ..EnsureSummary::default()
        },
        FamilyArg::Views => EnsureSummary {
            views: reconciler.reconcile_views()?.failed,
            ..EnsureSummary::default()
        },
        FamilyArg::Analyzers => EnsureSummary {
            analyzers: reconciler.reconcile_analyzers()?.failed,
            ..EnsureSummary::default()
        },
    };
    Ok(summary)
}

/// Only families that actually ran appear, so an unchecked family is never
/// reported as conformant.
fn summary_json(summary: &EnsureSummary, family: FamilyArg) -> Value {
    let selected = family.labels();
    let mut out = Map::new();
    for (label, ids) in summary.families() {
        if selected.contains(&label) {
            out.insert(label.to_string(), Value::from(ids.to_vec()));
        }
    }
    Value::Object(out)
}
