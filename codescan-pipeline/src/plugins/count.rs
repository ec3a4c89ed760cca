//! File and line counting plugin (code phase)

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use codescan_core::ipc::codec::ConfigValue;

use crate::context::ExecutionContext;
use crate::pipeline::{Phase, PluginPipeline};
use crate::plugin::{PluginError, ScanPlugin};

/// Per-extension file and line counts.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExtensionCount {
    pub files: usize,
    pub lines: usize,
}

/// Output recorded under the `countInfo` namespace.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountReport {
    pub files: usize,
    pub lines: usize,
    pub by_extension: BTreeMap<String, ExtensionCount>,
}

/// Counts files and lines under the unit's scan roots.
///
/// Configuration:
/// - `extensions`: restrict counting to these extensions
/// - `exclude`: pattern matched against each file's path; matches are skipped
#[derive(Debug)]
pub struct CountInfoPlugin {
    extensions: Option<Vec<String>>,
    exclude: Option<Regex>,
}

impl CountInfoPlugin {
    pub const NAME: &'static str = "count-info";
    pub const NAMESPACE: &'static str = "countInfo";

    pub fn from_config(config: ConfigValue) -> Result<Self, PluginError> {
        let extensions = match config.get("extensions") {
            Some(value) => {
                let items = value.as_array().ok_or_else(|| {
                    PluginError::invalid_config(Self::NAME, "`extensions` must be an array")
                })?;
                let mut extensions = Vec::with_capacity(items.len());
                for item in items {
                    let ext = item.as_str().ok_or_else(|| {
                        PluginError::invalid_config(
                            Self::NAME,
                            "`extensions` entries must be strings",
                        )
                    })?;
                    extensions.push(ext.trim_start_matches('.').to_string());
                }
                Some(extensions)
            }
            None => None,
        };

        // Compile at construction time so a bad pattern surfaces as a
        // configuration error, not a runtime plugin failure.
        let exclude = match config.get("exclude") {
            Some(value) => {
                let pattern = value.as_pattern().ok_or_else(|| {
                    PluginError::invalid_config(Self::NAME, "`exclude` must be a pattern")
                })?;
                Some(pattern.compile().map_err(|e| {
                    PluginError::invalid_config(Self::NAME, e.to_string())
                })?)
            }
            None => None,
        };

        Ok(Self {
            extensions,
            exclude,
        })
    }

    fn scan(&self, ctx: &ExecutionContext) -> std::io::Result<CountReport> {
        let mut report = CountReport::default();
        for root in ctx.unit.scan_roots() {
            self.scan_root(&root, &mut report)?;
        }
        Ok(report)
    }

    fn scan_root(&self, root: &Path, report: &mut CountReport) -> std::io::Result<()> {
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(std::io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if let Some(exclude) = &self.exclude
                && exclude.is_match(&path.to_string_lossy())
            {
                continue;
            }
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "(none)".to_string());
            if let Some(extensions) = &self.extensions
                && !extensions.contains(&extension)
            {
                continue;
            }

            let lines = count_lines(path)?;
            report.files += 1;
            report.lines += lines;
            let bucket = report.by_extension.entry(extension).or_default();
            bucket.files += 1;
            bucket.lines += lines;
        }
        Ok(())
    }

    async fn run(self: Arc<Self>, ctx: &mut ExecutionContext) {
        match self.scan(ctx) {
            Ok(report) => {
                ctx.logger.info(&format!(
                    "count-info: {} files, {} lines",
                    report.files, report.lines
                ));
                match serde_json::to_value(&report) {
                    Ok(value) => ctx.record(Self::NAMESPACE, value),
                    Err(e) => {
                        ctx.logger
                            .error(&format!("count-info: failed to serialize report: {e}"));
                        ctx.record_failure(Self::NAMESPACE);
                    }
                }
            }
            Err(e) => {
                ctx.logger.error(&format!("count-info failed: {e}"));
                ctx.record_failure(Self::NAMESPACE);
            }
        }
    }
}

fn count_lines(path: &Path) -> std::io::Result<usize> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Ok(0);
    }
    let newlines = bytes.iter().filter(|b| **b == b'\n').count();
    // A trailing fragment without a newline still counts as a line
    if bytes.ends_with(b"\n") {
        Ok(newlines)
    } else {
        Ok(newlines + 1)
    }
}

impl ScanPlugin for CountInfoPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(self: Arc<Self>, pipeline: &mut PluginPipeline) -> Result<(), PluginError> {
        pipeline.tap(Phase::Code, Self::NAME, move |ctx| {
            let plugin = self.clone();
            Box::pin(async move {
                plugin.run(ctx).await;
                Ok(())
            })
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use codescan_core::Logger;
    use codescan_core::domain::Unit;
    use codescan_core::ipc::codec::Pattern;

    fn fixture_context(dir: &Path) -> ExecutionContext {
        let code_dir = dir.join("src");
        std::fs::create_dir_all(code_dir.join("nested")).unwrap();
        std::fs::write(code_dir.join("a.js"), "one\ntwo\nthree\n").unwrap();
        std::fs::write(code_dir.join("b.ts"), "one\ntwo").unwrap();
        std::fs::write(code_dir.join("a.spec.js"), "test\n").unwrap();
        std::fs::write(code_dir.join("nested/c.js"), "x\n").unwrap();

        let logger = Arc::new(
            Logger::for_worker_with_forward(&dir.join("worker.log"), Box::new(io::sink()))
                .unwrap(),
        );
        ExecutionContext::new(Unit::new("u1", dir, &code_dir), dir, logger)
    }

    fn config(json: serde_json::Value) -> ConfigValue {
        ConfigValue::from_wire(json)
    }

    #[tokio::test]
    async fn test_counts_files_and_lines_per_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = fixture_context(dir.path());

        let plugin = Arc::new(CountInfoPlugin::from_config(ConfigValue::Null).unwrap());
        plugin.run(&mut ctx).await;

        let report = ctx.results.get(CountInfoPlugin::NAMESPACE).unwrap();
        assert_eq!(report["files"], 4);
        assert_eq!(report["byExtension"]["js"]["files"], 3);
        assert_eq!(report["byExtension"]["js"]["lines"], 5);
        assert_eq!(report["byExtension"]["ts"]["lines"], 2);
    }

    #[tokio::test]
    async fn test_exclude_pattern_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = fixture_context(dir.path());

        let mut wire = serde_json::Map::new();
        wire.insert(
            "exclude".to_string(),
            ConfigValue::Pattern(Pattern::new("\\.spec\\.", "")).to_wire(),
        );
        let plugin =
            Arc::new(CountInfoPlugin::from_config(config(wire.into())).unwrap());
        plugin.run(&mut ctx).await;

        let report = ctx.results.get(CountInfoPlugin::NAMESPACE).unwrap();
        assert_eq!(report["files"], 3);
    }

    #[tokio::test]
    async fn test_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = fixture_context(dir.path());

        let plugin = Arc::new(
            CountInfoPlugin::from_config(config(serde_json::json!({"extensions": ["ts"]})))
                .unwrap(),
        );
        plugin.run(&mut ctx).await;

        let report = ctx.results.get(CountInfoPlugin::NAMESPACE).unwrap();
        assert_eq!(report["files"], 1);
        assert_eq!(report["lines"], 2);
    }

    #[tokio::test]
    async fn test_missing_code_dir_self_isolates_to_null() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            Logger::for_worker_with_forward(
                &dir.path().join("worker.log"),
                Box::new(io::sink()),
            )
            .unwrap(),
        );
        let unit = Unit::new("u1", dir.path(), dir.path().join("does-not-exist"));
        let mut ctx = ExecutionContext::new(unit, dir.path(), logger);

        let plugin = Arc::new(CountInfoPlugin::from_config(ConfigValue::Null).unwrap());
        plugin.run(&mut ctx).await;

        assert!(ctx.results.get(CountInfoPlugin::NAMESPACE).unwrap().is_null());
    }

    #[test]
    fn test_invalid_exclude_pattern_is_a_construction_error() {
        let wire = serde_json::json!({
            "exclude": {"__regexp": true, "pattern": "(unclosed", "flags": ""}
        });
        let err = CountInfoPlugin::from_config(config(wire)).unwrap_err();
        assert!(matches!(err, PluginError::InvalidConfig { .. }));
    }
}
