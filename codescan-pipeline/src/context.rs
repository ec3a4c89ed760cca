//! Per-unit execution context

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use codescan_core::Logger;
use codescan_core::domain::{RESULT_FILE, ScanResults, Unit};

/// Mutable per-unit state threaded through the pipeline.
///
/// Created once per worker process. `results` starts empty and is the
/// sole shared mutable state: every plugin writes exactly one namespaced
/// key into it. The context never leaves the process that created it.
pub struct ExecutionContext {
    /// The unit under analysis
    pub unit: Unit,
    /// This unit's artifact directory (`result.json`, `worker.log`)
    pub output_dir: PathBuf,
    /// Namespaced plugin output, write-once per key
    pub results: ScanResults,
    /// The process-owned logger (file + parent forwarding)
    pub logger: Arc<Logger>,
}

impl ExecutionContext {
    pub fn new(unit: Unit, output_dir: impl Into<PathBuf>, logger: Arc<Logger>) -> Self {
        Self {
            unit,
            output_dir: output_dir.into(),
            results: ScanResults::new(),
            logger,
        }
    }

    /// Record a plugin's output under its namespace.
    ///
    /// A duplicate namespace is a contract violation between plugins; it
    /// is logged at error level and the first write is kept.
    pub fn record(&mut self, namespace: &str, value: Value) {
        if let Err(e) = self.results.insert(namespace, value) {
            self.logger.error(&e.to_string());
        }
    }

    /// Record a plugin failure as `null` under its namespace.
    pub fn record_failure(&mut self, namespace: &str) {
        if let Err(e) = self.results.record_failure(namespace) {
            self.logger.error(&e.to_string());
        }
    }

    /// Path of this unit's result artifact.
    pub fn result_file(&self) -> PathBuf {
        self.output_dir.join(RESULT_FILE)
    }

    /// Persist the current results to `result.json`, pretty-printed.
    ///
    /// Called at pipeline termination — after the last phase, or after an
    /// abort, so partial results from completed taps are still on disk.
    pub async fn persist_results(&self) -> io::Result<PathBuf> {
        let path = self.result_file();
        let body = serde_json::to_string_pretty(&self.results).map_err(io::Error::other)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_context(dir: &std::path::Path) -> ExecutionContext {
        let logger = Arc::new(
            Logger::for_worker_with_forward(&dir.join("worker.log"), Box::new(io::sink()))
                .unwrap(),
        );
        ExecutionContext::new(Unit::new("u1", "/r", "/r/src"), dir, logger)
    }

    #[tokio::test]
    async fn test_persist_results_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.record("countInfo", json!({"files": 2}));
        ctx.record_failure("lintInfo");

        let path = ctx.persist_results().await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, json!({"countInfo": {"files": 2}, "lintInfo": null}));
        // Pretty-printed, not a single line
        assert!(content.lines().count() > 1);
    }

    #[tokio::test]
    async fn test_duplicate_record_keeps_first_write_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.record("countInfo", json!(1));
        ctx.record("countInfo", json!(2));

        assert_eq!(ctx.results.get("countInfo").unwrap(), &json!(1));
        ctx.logger.flush().unwrap();
        let log = std::fs::read_to_string(dir.path().join("worker.log")).unwrap();
        assert!(log.contains("already populated"));
    }
}
