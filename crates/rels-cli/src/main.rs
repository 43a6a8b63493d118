use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::ensure::{EnsureArgs, FamilyArg};

#[derive(Parser)]
#[command(name = "rels")]
#[command(about = "Declarative schema conformance checks for ArangoDB", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare declared indexes, views and analyzers against the live server
    Ensure {
        /// Which family to check
        #[arg(long, value_enum, default_value_t = FamilyArg::All)]
        family: FamilyArg,

        /// Layered config paths in merge order (base -> env -> local...)
        #[arg(long = "config", required = true)]
        config_paths: Vec<PathBuf>,

        /// Spec root; overrides `specs.root` from config
        #[arg(long = "spec-root")]
        spec_root: Option<PathBuf>,

        /// Exit with status 2 when any declared spec is not satisfied
        #[arg(long, default_value_t = false)]
        fail_on_drift: bool,

        /// Treat config keys nothing reads as an error instead of a warning
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing() {
    // stdout carries the JSON summary; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Ensure {
            family,
            config_paths,
            spec_root,
            fail_on_drift,
            strict_config,
        } => commands::ensure::run(EnsureArgs {
            family,
            config_paths,
            spec_root,
            fail_on_drift,
            strict_config,
        }),

        Commands::ConfigHash { paths } => {
            let loaded = rels_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(ExitCode::SUCCESS)
        }
    }
}
