//! Plugin descriptor shared with every worker process

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ipc::codec::ConfigValue;

/// Identifies one analyzer plugin and its parameters.
///
/// Descriptors are immutable; the pool serializes the full descriptor list
/// once and passes an identical copy to every spawned worker. The `config`
/// field is a [`ConfigValue`] so regular expressions survive the process
/// boundary (see [`crate::ipc::codec`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Built-in plugin name, resolved through the worker's plugin registry
    pub name: String,
    /// Plugin-specific configuration, passed to the plugin factory
    #[serde(default)]
    pub config: ConfigValue,
    /// Path to an external analyzer executable; when set, the worker runs
    /// it through the external-command plugin instead of the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_plugin_path: Option<PathBuf>,
}

impl PluginDescriptor {
    /// Descriptor for a built-in plugin.
    pub fn builtin(name: impl Into<String>, config: ConfigValue) -> Self {
        Self {
            name: name.into(),
            config,
            custom_plugin_path: None,
        }
    }

    /// Descriptor for an external analyzer executable.
    pub fn external(name: impl Into<String>, path: impl Into<PathBuf>, config: ConfigValue) -> Self {
        Self {
            name: name.into(),
            config,
            custom_plugin_path: Some(path.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::codec::Pattern;

    #[test]
    fn test_descriptor_round_trip_preserves_patterns() {
        let mut config = std::collections::BTreeMap::new();
        config.insert(
            "exclude".to_string(),
            ConfigValue::Pattern(Pattern::new("\\.test\\.js$", "i")),
        );
        let descriptor = PluginDescriptor::builtin("count-info", ConfigValue::Object(config));

        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("__regexp"));

        let decoded: PluginDescriptor = serde_json::from_str(&json).unwrap();
        match decoded.config.get("exclude") {
            Some(ConfigValue::Pattern(p)) => {
                assert_eq!(p.source, "\\.test\\.js$");
                assert_eq!(p.flags, "i");
            }
            other => panic!("expected pattern, got {other:?}"),
        }
    }

    #[test]
    fn test_descriptor_defaults() {
        let json = r#"{"name":"count-info"}"#;
        let descriptor: PluginDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.config.is_null());
        assert!(descriptor.custom_plugin_path.is_none());
    }
}
