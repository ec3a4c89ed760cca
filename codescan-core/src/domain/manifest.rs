//! Run-level manifest aggregating all settled units

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of one successfully settled unit.
///
/// Produced exactly once per unit. Units that reject (non-zero exit,
/// spawn failure, missing artifacts) are logged and omitted from the
/// manifest rather than represented here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Unit name as submitted
    pub unit_name: String,
    /// Wall-clock duration of the unit process, measured at the pool
    pub duration_ms: u64,
    /// Path to the unit's `result.json`
    pub result_file: PathBuf,
    /// Path to the unit's private `worker.log`
    pub log_file: PathBuf,
}

/// Run summary written once at the end of a pool run, overwriting any
/// prior run's manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Settled units, in completion order
    pub entries: Vec<ManifestEntry>,
    /// Wall-clock duration of the whole run
    pub total_duration_ms: u64,
    /// Path to the pool's aggregate `scanner.log`
    pub log_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_wire_format_is_camel_case() {
        let manifest = Manifest {
            entries: vec![ManifestEntry {
                unit_name: "frontend".to_string(),
                duration_ms: 1200,
                result_file: PathBuf::from("out/frontend/result.json"),
                log_file: PathBuf::from("out/frontend/worker.log"),
            }],
            total_duration_ms: 1500,
            log_file: PathBuf::from("out/scanner.log"),
        };

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"unitName\""));
        assert!(json.contains("\"durationMs\""));
        assert!(json.contains("\"totalDurationMs\""));

        let decoded: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[0].unit_name, "frontend");
    }
}
