//! Worker start arguments

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{PluginDescriptor, Unit};

/// Errors raised while decoding worker start arguments.
#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("invalid unit descriptor: {0}")]
    Unit(serde_json::Error),

    #[error("invalid plugin descriptor list: {0}")]
    Plugins(serde_json::Error),
}

/// Everything a worker process needs to run one unit, passed as three
/// positional startup strings: the JSON unit descriptor, the plain output
/// directory, and the JSON plugin descriptor list.
#[derive(Debug, Clone)]
pub struct WorkerArgs {
    pub unit: Unit,
    pub output_dir: PathBuf,
    pub plugins: Vec<PluginDescriptor>,
}

impl WorkerArgs {
    /// Encode into the three positional argument strings, in order.
    pub fn encode(&self) -> Result<[String; 3], serde_json::Error> {
        Ok([
            serde_json::to_string(&self.unit)?,
            self.output_dir.to_string_lossy().into_owned(),
            serde_json::to_string(&self.plugins)?,
        ])
    }

    /// Decode from the worker's argv.
    pub fn decode(
        unit_json: &str,
        output_dir: PathBuf,
        plugins_json: &str,
    ) -> Result<Self, ArgsError> {
        let unit = serde_json::from_str(unit_json).map_err(ArgsError::Unit)?;
        let plugins = serde_json::from_str(plugins_json).map_err(ArgsError::Plugins)?;
        Ok(Self {
            unit,
            output_dir,
            plugins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::codec::{ConfigValue, Pattern};

    #[test]
    fn test_encode_decode_round_trip() {
        let args = WorkerArgs {
            unit: Unit::new("frontend", "/repos/app", "/repos/app/src"),
            output_dir: PathBuf::from("/tmp/scan/frontend"),
            plugins: vec![PluginDescriptor::builtin(
                "count-info",
                ConfigValue::Pattern(Pattern::new("\\.spec\\.", "i")),
            )],
        };

        let [unit_json, output_dir, plugins_json] = args.encode().unwrap();
        let decoded =
            WorkerArgs::decode(&unit_json, PathBuf::from(&output_dir), &plugins_json).unwrap();

        assert_eq!(decoded.unit.name, "frontend");
        assert_eq!(decoded.output_dir, PathBuf::from("/tmp/scan/frontend"));
        assert_eq!(decoded.plugins.len(), 1);
        assert_eq!(
            decoded.plugins[0].config.as_pattern().unwrap().source,
            "\\.spec\\."
        );
    }

    #[test]
    fn test_invalid_unit_json_is_an_error() {
        let err = WorkerArgs::decode("not json", PathBuf::from("/tmp"), "[]").unwrap_err();
        assert!(matches!(err, ArgsError::Unit(_)));
    }

    #[test]
    fn test_invalid_plugin_json_is_an_error() {
        let unit_json = serde_json::to_string(&Unit::new("u", "/r", "/r/src")).unwrap();
        let err = WorkerArgs::decode(&unit_json, PathBuf::from("/tmp"), "{oops").unwrap_err();
        assert!(matches!(err, ArgsError::Plugins(_)));
    }
}
