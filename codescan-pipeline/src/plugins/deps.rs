//! Declared-dependency plugin (dependency phase)

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use codescan_core::ipc::codec::ConfigValue;

use crate::context::ExecutionContext;
use crate::pipeline::{Phase, PluginPipeline};
use crate::plugin::{PluginError, ScanPlugin};

/// Output recorded under the `dependencyInfo` namespace.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    /// Manifest file the dependencies were read from, relative to `base_dir`
    pub manifest: Option<String>,
    pub dependencies: Vec<String>,
    pub dev_dependencies: Vec<String>,
    /// Module aliases configured for this unit
    pub alias_count: usize,
}

/// Reads declared dependencies from the unit's package manifest.
///
/// `package.json` and `Cargo.toml` are recognized, in that order of
/// preference when both exist.
///
/// Configuration:
/// - `includeDev`: also collect dev dependencies (default true)
#[derive(Debug)]
pub struct DependencyInfoPlugin {
    include_dev: bool,
}

impl DependencyInfoPlugin {
    pub const NAME: &'static str = "dependency-info";
    pub const NAMESPACE: &'static str = "dependencyInfo";

    pub fn from_config(config: ConfigValue) -> Result<Self, PluginError> {
        let include_dev = match config.get("includeDev") {
            Some(value) => value.as_bool().ok_or_else(|| {
                PluginError::invalid_config(Self::NAME, "`includeDev` must be a boolean")
            })?,
            None => true,
        };
        Ok(Self { include_dev })
    }

    fn manifest_path(&self, ctx: &ExecutionContext) -> Option<(PathBuf, &'static str)> {
        for file_name in ["package.json", "Cargo.toml"] {
            let candidate = ctx.unit.base_dir.join(file_name);
            if candidate.is_file() {
                return Some((candidate, file_name));
            }
        }
        None
    }

    fn read_report(&self, ctx: &ExecutionContext) -> std::io::Result<DependencyReport> {
        let alias_count = ctx.unit.alias_config.len();
        let Some((manifest_path, file_name)) = self.manifest_path(ctx) else {
            return Ok(DependencyReport {
                manifest: None,
                dependencies: Vec::new(),
                dev_dependencies: Vec::new(),
                alias_count,
            });
        };

        let body = std::fs::read_to_string(&manifest_path)?;
        let (dependencies, dev_dependencies) = match file_name {
            "Cargo.toml" => {
                let manifest: toml::Value =
                    toml::from_str(&body).map_err(std::io::Error::other)?;
                (
                    table_names(&manifest, "dependencies"),
                    if self.include_dev {
                        table_names(&manifest, "dev-dependencies")
                    } else {
                        Vec::new()
                    },
                )
            }
            _ => {
                let manifest: Value = serde_json::from_str(&body).map_err(std::io::Error::other)?;
                (
                    section_names(&manifest, "dependencies"),
                    if self.include_dev {
                        section_names(&manifest, "devDependencies")
                    } else {
                        Vec::new()
                    },
                )
            }
        };

        Ok(DependencyReport {
            manifest: Some(file_name.to_string()),
            dependencies,
            dev_dependencies,
            alias_count,
        })
    }

    async fn run(self: Arc<Self>, ctx: &mut ExecutionContext) {
        match self.read_report(ctx) {
            Ok(report) => {
                if report.manifest.is_none() {
                    ctx.logger
                        .warn("dependency-info: no package manifest found");
                }
                ctx.logger.info(&format!(
                    "dependency-info: {} dependencies, {} dev dependencies",
                    report.dependencies.len(),
                    report.dev_dependencies.len()
                ));
                match serde_json::to_value(&report) {
                    Ok(value) => ctx.record(Self::NAMESPACE, value),
                    Err(e) => {
                        ctx.logger.error(&format!(
                            "dependency-info: failed to serialize report: {e}"
                        ));
                        ctx.record_failure(Self::NAMESPACE);
                    }
                }
            }
            Err(e) => {
                ctx.logger.error(&format!("dependency-info failed: {e}"));
                ctx.record_failure(Self::NAMESPACE);
            }
        }
    }
}

fn section_names(manifest: &Value, section: &str) -> Vec<String> {
    manifest
        .get(section)
        .and_then(Value::as_object)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

fn table_names(manifest: &toml::Value, section: &str) -> Vec<String> {
    manifest
        .get(section)
        .and_then(toml::Value::as_table)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

impl ScanPlugin for DependencyInfoPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(self: Arc<Self>, pipeline: &mut PluginPipeline) -> Result<(), PluginError> {
        pipeline.tap(Phase::Dependency, Self::NAME, move |ctx| {
            let plugin = self.clone();
            Box::pin(async move {
                plugin.run(ctx).await;
                Ok(())
            })
        });
        Ok(())
    }
}
