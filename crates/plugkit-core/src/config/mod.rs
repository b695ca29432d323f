//! Engine configuration schemas.
//!
//! Configuration is layered with the `config` crate: an optional TOML file,
//! an optional environment overlay file, and `PLUGKIT__*` environment
//! variables. Each sub-module is one configuration section.

pub mod discovery;
pub mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};

use self::discovery::DiscoveryConfig;
use self::logging::LoggingConfig;

use crate::error::PluginError;

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Project name markers must carry to be picked up by the manager.
    #[serde(default = "default_project_name")]
    pub project_name: String,
    /// Plugin discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            discovery: DiscoveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the `config/` directory.
    ///
    /// Merges `config/default.toml` with an environment-specific overlay
    /// and environment variables prefixed with `PLUGKIT__`.
    pub fn load(env: &str) -> Result<Self, PluginError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(environment())
            .build()
            .map_err(|e| PluginError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| PluginError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load configuration from an explicit file path plus the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PluginError::configuration(format!(
                "Config file '{}' does not exist",
                path.display()
            )));
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("PLUGKIT")
        .separator("__")
        .try_parsing(true)
}

fn default_project_name() -> String {
    "plugkit".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.project_name, "plugkit");
        assert!(config.discovery.autodiscover);
        assert!(config.discovery.ignore_errors);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file_reads_sections() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        writeln!(
            file,
            r#"
project_name = "myapp"

[discovery]
entry_point_group = "myapp.plugins"
module_prefix = "myapp_"
ignore_errors = false

[logging]
level = "debug"
format = "json"
"#
        )
        .expect("write temp config");

        let config = EngineConfig::from_file(file.path()).expect("load config");
        assert_eq!(config.project_name, "myapp");
        assert_eq!(
            config.discovery.entry_point_group.as_deref(),
            Some("myapp.plugins")
        );
        assert_eq!(config.discovery.module_prefix.as_deref(), Some("myapp_"));
        assert!(!config.discovery.ignore_errors);
        assert!(config.discovery.autodiscover);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = EngineConfig::from_file(dir.path().join("missing.toml"))
            .expect_err("missing file must fail");
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }
}
