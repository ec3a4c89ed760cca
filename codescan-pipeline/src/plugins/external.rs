//! External-command plugin
//!
//! Runs an independently-authored analyzer executable as a subprocess and
//! records its stdout JSON under the plugin's namespace. This is the
//! narrow "load external module by path" capability: the loadable set
//! stays enumerable (one executable per descriptor) and failure stays
//! isolated to the plugin's own namespace.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use codescan_core::ipc::codec::ConfigValue;

use crate::context::ExecutionContext;
use crate::pipeline::{Phase, PluginPipeline};
use crate::plugin::{PluginError, ScanPlugin};

/// Plugin wrapping an external analyzer executable.
///
/// The executable is invoked as:
///
/// ```text
/// <path> --config <json> --code-dir <dir>
/// ```
///
/// and must print one JSON document to stdout. Configuration fields
/// interpreted by the wrapper itself:
/// - `phase`: pipeline phase to tap (default `quality`)
/// - `namespace`: result key to populate (default: the plugin name)
#[derive(Debug)]
pub struct ExternalCommandPlugin {
    name: String,
    path: PathBuf,
    phase: Phase,
    namespace: String,
    config: ConfigValue,
}

impl ExternalCommandPlugin {
    pub fn new(name: String, path: PathBuf, config: ConfigValue) -> Result<Self, PluginError> {
        if !path.is_file() {
            return Err(PluginError::MissingExternal(path));
        }

        let phase = match config.get("phase") {
            Some(value) => {
                let name_str = value.as_str().ok_or_else(|| {
                    PluginError::invalid_config(name.as_str(), "`phase` must be a string")
                })?;
                Phase::parse(name_str).ok_or_else(|| {
                    PluginError::invalid_config(name.as_str(), format!("unknown phase `{name_str}`"))
                })?
            }
            None => Phase::Quality,
        };

        let namespace = config
            .get("namespace")
            .and_then(ConfigValue::as_str)
            .unwrap_or(&name)
            .to_string();

        Ok(Self {
            name,
            path,
            phase,
            namespace,
            config,
        })
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value, String> {
        let config_json =
            serde_json::to_string(&self.config).map_err(|e| format!("config encode: {e}"))?;

        debug!(plugin = %self.name, path = %self.path.display(), "spawning external analyzer");

        let output = Command::new(&self.path)
            .arg("--config")
            .arg(&config_json)
            .arg("--code-dir")
            .arg(&ctx.unit.code_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("spawn failed: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| format!("invalid output JSON: {e}"))
    }

    async fn run(self: Arc<Self>, ctx: &mut ExecutionContext) {
        match self.execute(ctx).await {
            Ok(value) => {
                ctx.logger
                    .info(&format!("{}: external analyzer completed", self.name));
                ctx.record(&self.namespace, value);
            }
            Err(e) => {
                ctx.logger
                    .error(&format!("{}: external analyzer failed: {e}", self.name));
                ctx.record_failure(&self.namespace);
            }
        }
    }
}

impl ScanPlugin for ExternalCommandPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(self: Arc<Self>, pipeline: &mut PluginPipeline) -> Result<(), PluginError> {
        let phase = self.phase;
        let tap_name = self.name.clone();
        pipeline.tap(phase, tap_name, move |ctx| {
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
    use std::path::Path;

    use codescan_core::Logger;
    use codescan_core::domain::Unit;

    fn test_context(dir: &Path) -> ExecutionContext {
        let logger = Arc::new(
            Logger::for_worker_with_forward(&dir.join("worker.log"), Box::new(io::sink()))
                .unwrap(),
        );
        ExecutionContext::new(Unit::new("u1", dir, dir.join("src")), dir, logger)
    }

    #[cfg(unix)]
    fn write_analyzer(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("analyzer.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_missing_executable_is_a_construction_error() {
        let err = ExternalCommandPlugin::new(
            "my-analyzer".to_string(),
            PathBuf::from("/nonexistent/analyzer"),
            ConfigValue::Null,
        )
        .unwrap_err();
        assert!(matches!(err, PluginError::MissingExternal(_)));
    }

    #[test]
    fn test_unknown_phase_is_a_construction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer");
        std::fs::write(&path, "").unwrap();

        let config = ConfigValue::from_wire(serde_json::json!({"phase": "lint"}));
        let err =
            ExternalCommandPlugin::new("my-analyzer".to_string(), path, config).unwrap_err();
        assert!(matches!(err, PluginError::InvalidConfig { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_records_analyzer_stdout_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_analyzer(dir.path(), r#"echo '{"issues": 3}'"#);

        let plugin = Arc::new(
            ExternalCommandPlugin::new("my-analyzer".to_string(), path, ConfigValue::Null)
                .unwrap(),
        );
        let mut ctx = test_context(dir.path());
        plugin.run(&mut ctx).await;

        assert_eq!(
            ctx.results.get("my-analyzer").unwrap(),
            &serde_json::json!({"issues": 3})
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_analyzer_self_isolates_to_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_analyzer(dir.path(), "echo broken >&2\nexit 2");

        let plugin = Arc::new(
            ExternalCommandPlugin::new("my-analyzer".to_string(), path, ConfigValue::Null)
                .unwrap(),
        );
        let mut ctx = test_context(dir.path());
        plugin.run(&mut ctx).await;

        assert!(ctx.results.get("my-analyzer").unwrap().is_null());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_namespace_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_analyzer(dir.path(), "echo '{}'");

        let config = ConfigValue::from_wire(serde_json::json!({"namespace": "customKey"}));
        let plugin = Arc::new(
            ExternalCommandPlugin::new("my-analyzer".to_string(), path, config).unwrap(),
        );
        let mut ctx = test_context(dir.path());
        plugin.run(&mut ctx).await;

        assert!(ctx.results.get("customKey").is_some());
    }
}
