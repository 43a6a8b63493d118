//! Runtime secret resolution.
//!
//! Config stores the NAME of the environment variable holding the database
//! password. Resolution happens once at startup; errors name the variable,
//! never its value.

use anyhow::{bail, Result};

use crate::EnsureConfig;

/// Database password resolved from the environment. Redacted in `Debug`.
#[derive(Clone)]
pub struct ArangoPassword(String);

impl ArangoPassword {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for ArangoPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ArangoPassword(<REDACTED>)")
    }
}

/// Read the password from the variable named by `password_env`.
pub fn resolve_arango_password(cfg: &EnsureConfig) -> Result<ArangoPassword> {
    resolve_password_with(&cfg.password_env, |name| std::env::var(name).ok())
}

/// Same as [`resolve_arango_password`] with an explicit environment lookup.
pub fn resolve_password_with<F>(var_name: &str, lookup: F) -> Result<ArangoPassword>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        Some(v) if !v.trim().is_empty() => Ok(ArangoPassword(v)),
        _ => bail!(
            "SECRETS_MISSING: required env var '{}' (arango password) is not set or empty",
            var_name
        ),
    }
}
