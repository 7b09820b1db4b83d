//! YAML configuration loading.

use std::path::Path;

use super::error::ConfigError;
use super::types::ConfigFile;

/// Loader for YAML configuration files.
pub struct YamlLoader;

impl YamlLoader {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a string (tests, embedded defaults).
    pub fn from_str(contents: &str) -> Result<ConfigFile, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}
