//! Core domain model: units, plugin descriptors, scan results, and the manifest

pub mod manifest;
pub mod plugin;
pub mod results;
pub mod unit;

pub use manifest::{Manifest, ManifestEntry};
pub use plugin::PluginDescriptor;
pub use results::{ResultsError, ScanResults};
pub use unit::Unit;

/// Per-unit result artifact, written by the worker under its output directory.
pub const RESULT_FILE: &str = "result.json";

/// Per-unit private log, written by the worker under its output directory.
pub const WORKER_LOG_FILE: &str = "worker.log";

/// Aggregate run log, written by the pool under the output root.
pub const POOL_LOG_FILE: &str = "scanner.log";

/// Run manifest, written by the pool under the output root.
pub const MANIFEST_FILE: &str = "manifest.json";
