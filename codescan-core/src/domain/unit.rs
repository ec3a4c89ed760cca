//! Analysis unit descriptor

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One codebase submitted for analysis.
///
/// A unit maps 1:1 to one spawned worker process. It is immutable once
/// submitted: the pool keeps ownership and passes a serialized copy to the
/// spawned process as a startup argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Unit name, unique within a run; names the per-unit output directory
    /// and prefixes forwarded log lines
    pub name: String,
    /// Root directory of the codebase
    pub base_dir: PathBuf,
    /// Directory containing the source code to analyze
    pub code_dir: PathBuf,
    /// Build output directory, if the codebase has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
    /// Module alias mappings (alias → path), forwarded to plugins verbatim
    #[serde(default)]
    pub alias_config: HashMap<String, String>,
    /// Restrict analysis to these subdirectories of `code_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_dirs: Option<Vec<String>>,
}

impl Unit {
    /// Create a unit with the minimum required fields.
    pub fn new(
        name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        code_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            code_dir: code_dir.into(),
            build_dir: None,
            alias_config: HashMap::new(),
            sub_dirs: None,
        }
    }

    /// The directories to walk when scanning this unit's code: `sub_dirs`
    /// resolved against `code_dir` when set, otherwise `code_dir` itself.
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        match &self.sub_dirs {
            Some(dirs) => dirs.iter().map(|d| self.code_dir.join(d)).collect(),
            None => vec![self.code_dir.clone()],
        }
    }
}
