//! End-to-end pipeline tests: descriptors → registry → pipeline → results
//!
//! These run the real built-in plugins in-process, exercising the same
//! path the worker binary takes minus the process boundary.

use std::io;
use std::path::Path;
use std::sync::Arc;

use codescan_core::Logger;
use codescan_core::domain::{PluginDescriptor, Unit};
use codescan_core::ipc::codec::{ConfigValue, Pattern};
use codescan_pipeline::{
    ExecutionContext, Phase, PluginError, PluginPipeline, PluginRegistry, ScanPlugin,
};

fn fixture_unit(dir: &Path) -> Unit {
    let code_dir = dir.join("src");
    std::fs::create_dir_all(&code_dir).unwrap();
    std::fs::write(code_dir.join("app.js"), "const a = 1;\nconst b = 2;\n").unwrap();
    std::fs::write(code_dir.join("app.spec.js"), "test\n").unwrap();
    std::fs::write(
        dir.join("package.json"),
        r#"{"dependencies":{"react":"^18.0.0"}}"#,
    )
    .unwrap();
    Unit::new("fixture", dir, &code_dir)
}

fn quiet_logger(dir: &Path) -> Arc<Logger> {
    Arc::new(
        Logger::for_worker_with_forward(&dir.join("worker.log"), Box::new(io::sink())).unwrap(),
    )
}

fn build_pipeline(
    registry: &PluginRegistry,
    descriptors: &[PluginDescriptor],
) -> Result<PluginPipeline, PluginError> {
    let mut pipeline = PluginPipeline::new();
    for descriptor in descriptors {
        registry.instantiate(descriptor)?.apply(&mut pipeline)?;
    }
    Ok(pipeline)
}

#[tokio::test]
async fn test_builtin_plugins_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let unit = fixture_unit(dir.path());

    let mut count_config = std::collections::BTreeMap::new();
    count_config.insert(
        "exclude".to_string(),
        ConfigValue::Pattern(Pattern::new("\\.spec\\.", "")),
    );
    let descriptors = vec![
        PluginDescriptor::builtin("count-info", ConfigValue::Object(count_config)),
        PluginDescriptor::builtin("dependency-info", ConfigValue::Null),
        PluginDescriptor::builtin("quality-summary", ConfigValue::Null),
    ];

    // Descriptors survive the wire exactly as the pool would send them
    let wire = serde_json::to_string(&descriptors).unwrap();
    let descriptors: Vec<PluginDescriptor> = serde_json::from_str(&wire).unwrap();

    let registry = PluginRegistry::with_builtins();
    let pipeline = build_pipeline(&registry, &descriptors).unwrap();
    let mut ctx = ExecutionContext::new(unit, dir.path(), quiet_logger(dir.path()));
    pipeline.run(&mut ctx).await.unwrap();

    let counts = ctx.results.get("countInfo").unwrap();
    assert_eq!(counts["files"], 1);
    assert_eq!(counts["lines"], 2);

    let deps = ctx.results.get("dependencyInfo").unwrap();
    assert_eq!(deps["dependencies"][0], "react");

    // Quality phase saw what the earlier phases wrote
    let quality = ctx.results.get("qualitySummary").unwrap();
    assert_eq!(quality["totalFiles"], 1);
    assert_eq!(quality["dependencyCount"], 1);
}

/// Plugin that fails internally on every run but honors the isolation
/// contract: log, record null, let the pipeline continue.
#[derive(Debug)]
struct BrokenPlugin;

impl BrokenPlugin {
    const NAMESPACE: &'static str = "brokenInfo";
}

impl ScanPlugin for BrokenPlugin {
    fn name(&self) -> &str {
        "broken"
    }

    fn apply(self: Arc<Self>, pipeline: &mut PluginPipeline) -> Result<(), PluginError> {
        pipeline.tap(Phase::Project, "broken", move |ctx| {
            Box::pin(async move {
                ctx.logger.error("broken: simulated analyzer crash");
                ctx.record_failure(Self::NAMESPACE);
                Ok(())
            })
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_self_isolating_failure_does_not_fail_the_unit() {
    let dir = tempfile::tempdir().unwrap();
    let unit = fixture_unit(dir.path());

    let registry = PluginRegistry::with_builtins();
    let descriptors = vec![
        PluginDescriptor::builtin("count-info", ConfigValue::Null),
        PluginDescriptor::builtin("quality-summary", ConfigValue::Null),
    ];
    let mut pipeline = build_pipeline(&registry, &descriptors).unwrap();
    Arc::new(BrokenPlugin).apply(&mut pipeline).unwrap();

    let mut ctx = ExecutionContext::new(unit, dir.path(), quiet_logger(dir.path()));
    pipeline.run(&mut ctx).await.unwrap();

    // The failed plugin's key is null; every other key is populated
    assert!(ctx.results.get(BrokenPlugin::NAMESPACE).unwrap().is_null());
    assert!(!ctx.results.get("countInfo").unwrap().is_null());
    assert!(!ctx.results.get("qualitySummary").unwrap().is_null());

    // And the unit's artifacts still land on disk
    let path = ctx.persist_results().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_unknown_descriptor_fails_construction_not_execution() {
    let registry = PluginRegistry::with_builtins();
    let descriptors = vec![
        PluginDescriptor::builtin("count-info", ConfigValue::Null),
        PluginDescriptor::builtin("not-a-plugin", ConfigValue::Null),
    ];
    let err = build_pipeline(&registry, &descriptors).unwrap_err();
    assert!(matches!(err, PluginError::UnknownPlugin(_)));
}
