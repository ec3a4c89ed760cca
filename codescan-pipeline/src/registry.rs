//! Explicit plugin registry
//!
//! Built-in plugins are resolved by name from a registry populated at
//! startup, keeping the loadable plugin set enumerable and checkable. A
//! descriptor carrying `custom_plugin_path` bypasses the registry and is
//! resolved to the external-command plugin instead.

use std::collections::HashMap;
use std::sync::Arc;

use codescan_core::domain::PluginDescriptor;
use codescan_core::ipc::codec::ConfigValue;

use crate::plugin::{PluginError, ScanPlugin};
use crate::plugins::count::CountInfoPlugin;
use crate::plugins::deps::DependencyInfoPlugin;
use crate::plugins::external::ExternalCommandPlugin;
use crate::plugins::quality::QualitySummaryPlugin;

/// Factory constructing one plugin from its configuration.
pub type PluginFactory = fn(ConfigValue) -> Result<Arc<dyn ScanPlugin>, PluginError>;

/// Registry mapping built-in plugin names to factories.
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in plugin.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CountInfoPlugin::NAME, |config| {
            Ok(Arc::new(CountInfoPlugin::from_config(config)?))
        });
        registry.register(DependencyInfoPlugin::NAME, |config| {
            Ok(Arc::new(DependencyInfoPlugin::from_config(config)?))
        });
        registry.register(QualitySummaryPlugin::NAME, |config| {
            Ok(Arc::new(QualitySummaryPlugin::from_config(config)?))
        });
        registry
    }

    /// Register a factory under a name, replacing any previous binding.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Construct the plugin a descriptor names.
    ///
    /// An unknown name or a missing external executable is a fatal
    /// configuration error, not a per-plugin isolated failure.
    pub fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Arc<dyn ScanPlugin>, PluginError> {
        if let Some(path) = &descriptor.custom_plugin_path {
            let plugin = ExternalCommandPlugin::new(
                descriptor.name.clone(),
                path.clone(),
                descriptor.config.clone(),
            )?;
            return Ok(Arc::new(plugin));
        }

        let factory = self
            .factories
            .get(&descriptor.name)
            .ok_or_else(|| PluginError::UnknownPlugin(descriptor.name.clone()))?;
        factory(descriptor.config.clone())
    }

    /// Names of all registered built-in plugins.
    pub fn registered_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        let mut names = registry.registered_names();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["count-info", "dependency-info", "quality-summary"]
        );
    }

    #[test]
    fn test_unknown_plugin_is_a_construction_error() {
        let registry = PluginRegistry::with_builtins();
        let descriptor = PluginDescriptor::builtin("no-such-plugin", ConfigValue::Null);
        let err = registry.instantiate(&descriptor).unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(_)));
    }

    #[test]
    fn test_builtin_instantiation() {
        let registry = PluginRegistry::with_builtins();
        let descriptor = PluginDescriptor::builtin("count-info", ConfigValue::Null);
        let plugin = registry.instantiate(&descriptor).unwrap();
        assert_eq!(plugin.name(), "count-info");
    }

    #[test]
    fn test_missing_external_path_is_a_construction_error() {
        let registry = PluginRegistry::with_builtins();
        let descriptor = PluginDescriptor::external(
            "my-analyzer",
            "/nonexistent/analyzer",
            ConfigValue::Null,
        );
        let err = registry.instantiate(&descriptor).unwrap_err();
        assert!(matches!(err, PluginError::MissingExternal(_)));
    }
}
