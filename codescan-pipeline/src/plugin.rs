//! Plugin trait and construction errors

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::pipeline::PluginPipeline;

/// Errors raised while constructing or registering a plugin.
///
/// These are fatal configuration errors: the worker refuses to start the
/// pipeline rather than running with a partial plugin set.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown plugin `{0}`")]
    UnknownPlugin(String),

    #[error("invalid configuration for plugin `{plugin}`: {message}")]
    InvalidConfig { plugin: String, message: String },

    #[error("external plugin executable not found: {0}")]
    MissingExternal(PathBuf),
}

impl PluginError {
    pub fn invalid_config(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Trait every analyzer plugin implements.
///
/// `apply` is called exactly once, synchronously, at construction time; it
/// registers zero or more taps (typically one) on the pipeline, each
/// closing over the plugin's own configuration. Plugins must self-isolate
/// at execution time: a tap catches its own failures, logs them through
/// the context logger, and records `null` under its namespace — it never
/// lets an error escape into the pipeline.
pub trait ScanPlugin: std::fmt::Debug + Send + Sync {
    /// The plugin's registration name, used in tap names and logs.
    fn name(&self) -> &str;

    /// Register this plugin's taps on the pipeline.
    fn apply(self: Arc<Self>, pipeline: &mut PluginPipeline) -> Result<(), PluginError>;
}
