use crate::error::{GeoinvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for geoinv
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Root directory of the data archive
    pub archive_root: ConfigValue<PathBuf>,

    /// Default destination for project outputs
    pub datadir: ConfigValue<PathBuf>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            archive_root: ConfigValue::new(PathBuf::from("/data/archive"), ConfigSource::Default),
            datadir: ConfigValue::new(PathBuf::from("."), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| GeoinvError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {e}"),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeoinvError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {e}"),
            })?;

        if let Some(archive_root) = file_config.archive_root {
            self.archive_root.update(archive_root, ConfigSource::File);
        }
        if let Some(datadir) = file_config.datadir {
            self.datadir.update(datadir, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(root) = env::var("GEOINV_ARCHIVE_ROOT") {
            self.archive_root.update(PathBuf::from(root), ConfigSource::Environment);
        }
        if let Ok(datadir) = env::var("GEOINV_DATADIR") {
            self.datadir.update(PathBuf::from(datadir), ConfigSource::Environment);
        }
        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(archive_root) = overrides.archive_root {
            self.archive_root.update(archive_root, ConfigSource::Cli);
        }
        if let Some(datadir) = overrides.datadir {
            self.datadir.update(datadir, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();
        map.insert(
            "archive_root".to_string(),
            (self.archive_root.value.display().to_string(), self.archive_root.source),
        );
        map.insert(
            "datadir".to_string(),
            (self.datadir.value.display().to_string(), self.datadir.source),
        );
        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    archive_root: Option<PathBuf>,
    datadir: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub archive_root: Option<PathBuf>,
    pub datadir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.archive_root.value, PathBuf::from("/data/archive"));
        assert_eq!(config.archive_root.source, ConfigSource::Default);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
archive_root = "/srv/imagery"
datadir = "/srv/projects"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();
        assert_eq!(config.archive_root.value, PathBuf::from("/srv/imagery"));
        assert_eq!(config.archive_root.source, ConfigSource::File);
        assert_eq!(config.datadir.value, PathBuf::from("/srv/projects"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            archive_root: Some(PathBuf::from("/mnt/archive")),
            datadir: None,
        });
        assert_eq!(config.archive_root.value, PathBuf::from("/mnt/archive"));
        assert_eq!(config.archive_root.source, ConfigSource::Cli);
        assert_eq!(config.datadir.source, ConfigSource::Default);
    }

    #[test]
    fn test_rejects_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "archive_root = [1, 2]").unwrap();
        assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
    }
}
