//! Per-unit scan result map

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error raised when a plugin violates the result map contract.
#[derive(Debug, Error)]
pub enum ResultsError {
    /// A plugin tried to write a namespace another plugin already owns.
    /// Keys are write-once; silent overwrites between independently
    /// authored plugins are rejected, not supported.
    #[error("result namespace `{namespace}` is already populated")]
    DuplicateNamespace { namespace: String },
}

/// The mutable result map shared by every plugin of one unit.
///
/// Keys are plugin-chosen namespaces (e.g. `countInfo`); values are
/// arbitrary serializable output, or `null` when the owning plugin failed
/// and isolated its own error. Each key has exactly one writer; the map is
/// append-only and never leaves the worker process — it is persisted to
/// `result.json` at pipeline termination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResults {
    entries: BTreeMap<String, Value>,
}

impl ScanResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a plugin's output under its namespace.
    pub fn insert(&mut self, namespace: impl Into<String>, value: Value) -> Result<(), ResultsError> {
        let namespace = namespace.into();
        if self.entries.contains_key(&namespace) {
            return Err(ResultsError::DuplicateNamespace { namespace });
        }
        self.entries.insert(namespace, value);
        Ok(())
    }

    /// Record a plugin failure: the namespace is populated with `null` so
    /// the result file shows the plugin ran and failed, rather than being
    /// silently absent.
    pub fn record_failure(&mut self, namespace: impl Into<String>) -> Result<(), ResultsError> {
        self.insert(namespace, Value::Null)
    }

    pub fn get(&self, namespace: &str) -> Option<&Value> {
        self.entries.get(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
