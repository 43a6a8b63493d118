//! Typed view of the keys the `ensure` command reads.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_DB: &str = "_system";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD_ENV: &str = "ARANGO_PASSWORD";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SPEC_ROOT: &str = "spec";

/// Settings for one `ensure` run. Holds the password env var NAME only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureConfig {
    pub arango_url: String,
    pub arango_db: String,
    pub arango_user: String,
    pub password_env: String,
    pub timeout_secs: u64,
    pub spec_root: PathBuf,
    pub verbose: bool,
}

impl EnsureConfig {
    /// Read from a merged config tree. `/arango/url` is required; every other
    /// key has a default. Present keys of the wrong type are errors.
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let arango_url = match opt_str(config, "/arango/url")? {
            Some(url) => url,
            None => bail!("CONFIG_MISSING_KEY: /arango/url is required"),
        };

        let timeout_secs = match config.pointer("/arango/timeout_secs") {
            None | Some(Value::Null) => DEFAULT_TIMEOUT_SECS,
            Some(v) => match v.as_u64() {
                Some(0) | None => bail!(
                    "CONFIG_INVALID: /arango/timeout_secs must be a positive integer, got {v}"
                ),
                Some(n) => n,
            },
        };

        let verbose = match config.pointer("/report/verbose") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(v) => bail!("CONFIG_INVALID: /report/verbose must be a boolean, got {v}"),
        };

        Ok(Self {
            arango_url,
            arango_db: opt_str(config, "/arango/db")?.unwrap_or_else(|| DEFAULT_DB.to_string()),
            arango_user: opt_str(config, "/arango/user")?
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password_env: opt_str(config, "/arango/password_env")?
                .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string()),
            timeout_secs,
            spec_root: opt_str(config, "/specs/root")?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPEC_ROOT)),
            verbose,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Non-blank string at `pointer`, trimmed. Absent, null or blank is `None`.
fn opt_str(config: &Value, pointer: &str) -> Result<Option<String>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            Ok((!t.is_empty()).then(|| t.to_string()))
        }
        Some(v) => bail!("CONFIG_INVALID: {pointer} must be a string, got {v}"),
    }
}
