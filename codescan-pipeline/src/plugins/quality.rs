//! Quality summary plugin (quality phase)
//!
//! Reads the namespaces earlier phases populated — this is the
//! cross-phase contract the pipeline's ordering guarantees exist for.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use codescan_core::ipc::codec::ConfigValue;

use crate::context::ExecutionContext;
use crate::pipeline::{Phase, PluginPipeline};
use crate::plugin::{PluginError, ScanPlugin};
use crate::plugins::count::CountInfoPlugin;
use crate::plugins::deps::DependencyInfoPlugin;

/// Output recorded under the `qualitySummary` namespace.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub total_files: u64,
    pub total_lines: u64,
    pub avg_lines_per_file: f64,
    pub dependency_count: u64,
    pub flags: Vec<String>,
}

/// Derives summary metrics from `countInfo` and `dependencyInfo`.
///
/// Configuration:
/// - `maxAvgLines`: average-lines-per-file threshold above which the
///   `large-average-file` flag is raised (default 400)
#[derive(Debug)]
pub struct QualitySummaryPlugin {
    max_avg_lines: u64,
}

impl QualitySummaryPlugin {
    pub const NAME: &'static str = "quality-summary";
    pub const NAMESPACE: &'static str = "qualitySummary";

    const DEFAULT_MAX_AVG_LINES: u64 = 400;

    pub fn from_config(config: ConfigValue) -> Result<Self, PluginError> {
        let max_avg_lines = match config.get("maxAvgLines") {
            Some(value) => value.as_u64().ok_or_else(|| {
                PluginError::invalid_config(Self::NAME, "`maxAvgLines` must be a positive integer")
            })?,
            None => Self::DEFAULT_MAX_AVG_LINES,
        };
        Ok(Self { max_avg_lines })
    }

    fn summarize(&self, ctx: &ExecutionContext) -> Result<QualityReport, String> {
        let count = ctx
            .results
            .get(CountInfoPlugin::NAMESPACE)
            .filter(|v| !v.is_null())
            .ok_or("countInfo is missing or null")?;

        let total_files = read_u64(count, "files")?;
        let total_lines = read_u64(count, "lines")?;

        // dependencyInfo is optional input; a run without the dependency
        // plugin still gets a summary
        let dependency_count = ctx
            .results
            .get(DependencyInfoPlugin::NAMESPACE)
            .filter(|v| !v.is_null())
            .and_then(|v| v.get("dependencies"))
            .and_then(Value::as_array)
            .map(|deps| deps.len() as u64)
            .unwrap_or(0);

        let avg_lines_per_file = if total_files == 0 {
            0.0
        } else {
            total_lines as f64 / total_files as f64
        };

        let mut flags = Vec::new();
        if avg_lines_per_file > self.max_avg_lines as f64 {
            flags.push("large-average-file".to_string());
        }
        if total_files == 0 {
            flags.push("empty-codebase".to_string());
        }

        Ok(QualityReport {
            total_files,
            total_lines,
            avg_lines_per_file,
            dependency_count,
            flags,
        })
    }

    async fn run(self: Arc<Self>, ctx: &mut ExecutionContext) {
        match self.summarize(ctx) {
            Ok(report) => {
                ctx.logger.info(&format!(
                    "quality-summary: {} files, {} flags",
                    report.total_files,
                    report.flags.len()
                ));
                match serde_json::to_value(&report) {
                    Ok(value) => ctx.record(Self::NAMESPACE, value),
                    Err(e) => {
                        ctx.logger.error(&format!(
                            "quality-summary: failed to serialize report: {e}"
                        ));
                        ctx.record_failure(Self::NAMESPACE);
                    }
                }
            }
            Err(e) => {
                ctx.logger.error(&format!("quality-summary failed: {e}"));
                ctx.record_failure(Self::NAMESPACE);
            }
        }
    }
}

fn read_u64(value: &Value, field: &str) -> Result<u64, String> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("countInfo.{field} is missing or not a number"))
}

impl ScanPlugin for QualitySummaryPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(self: Arc<Self>, pipeline: &mut PluginPipeline) -> Result<(), PluginError> {
        pipeline.tap(Phase::Quality, Self::NAME, move |ctx| {
            let plugin = self.clone();
            Box::pin(async move {
                plugin.run(ctx).await;
                Ok(())
            })
        });
        Ok(())
    }
}
