//! rels-specs
//!
//! Filesystem-backed spec repository.
//!
//! Layout under the spec root:
//!
//! ```text
//! <root>/collections/**/*.{json,yaml,yml}
//! <root>/views/**/*.{json,yaml,yml}
//! <root>/analyzers/**/*.{json,yaml,yml}
//! ```
//!
//! Files are discovered recursively and returned sorted by path, so the load
//! order (and therefore report order) is stable across machines. Anything
//! that is not JSON or YAML is ignored; a missing family directory is an
//! empty family.

use std::path::{Path, PathBuf};

use rels_reconcile::{LocalSpec, LocalSpecProvider, SpecFamily, SpecSourceError};
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

/// Spec file formats, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SpecFormat::Json),
            "yaml" | "yml" => Some(SpecFormat::Yaml),
            _ => None,
        }
    }
}

/// A spec root on disk.
#[derive(Debug, Clone)]
pub struct SpecRepository {
    root: PathBuf,
}

impl SpecRepository {
    /// Open a spec root. The directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SpecSourceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SpecSourceError::Io {
                origin: root.display().to_string(),
                message: "spec root is not a directory".to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Every spec file of `family`, sorted by path.
    pub fn spec_paths(&self, family: SpecFamily) -> Result<Vec<PathBuf>, SpecSourceError> {
        let dir = self.root.join(family.dir_name());
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no {family} directory; family is empty");
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|e| SpecSourceError::Io {
                origin: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| dir.display().to_string()),
                message: e.to_string(),
            })?;
            if entry.file_type().is_file() && SpecFormat::from_path(entry.path()).is_some() {
                paths.push(entry.path().to_path_buf());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl LocalSpecProvider for SpecRepository {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list_specs(&self, family: SpecFamily) -> Result<Vec<LocalSpec>, SpecSourceError> {
        let paths = self.spec_paths(family)?;
        debug!(count = paths.len(), "loading {family} specs");
        paths.iter().map(|p| load_spec_file(p)).collect()
    }
}

/// Read and parse one spec file. The top level must be a mapping.
pub fn load_spec_file(path: &Path) -> Result<LocalSpec, SpecSourceError> {
    let origin = path.display().to_string();
    let format = SpecFormat::from_path(path).ok_or_else(|| SpecSourceError::Parse {
        origin: origin.clone(),
        message: "unsupported file extension (expected .json, .yaml or .yml)".to_string(),
    })?;
    let raw = std::fs::read_to_string(path).map_err(|e| SpecSourceError::Io {
        origin: origin.clone(),
        message: e.to_string(),
    })?;
    let doc = parse_spec(&origin, &raw, format)?;
    Ok(LocalSpec::new(origin, doc))
}

/// Parse spec text into a JSON tree.
pub fn parse_spec(origin: &str, raw: &str, format: SpecFormat) -> Result<Value, SpecSourceError> {
    let parse_err = |message: String| SpecSourceError::Parse {
        origin: origin.to_string(),
        message,
    };

    let doc: Value = match format {
        SpecFormat::Json => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string()))?,
        SpecFormat::Yaml => {
            let y: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string()))?;
            serde_json::to_value(y)
                .map_err(|e| parse_err(format!("yaml->json conversion failed: {e}")))?
        }
    };

    if !doc.is_object() {
        return Err(SpecSourceError::NotAnObject {
            origin: origin.to_string(),
        });
    }
    Ok(doc)
}
