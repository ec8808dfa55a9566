use std::{collections::HashMap, env, fs, path::PathBuf};

use crate::errors::ConfigError;

use super::{HolderConfig, PartialHolderConfig, ENV_CLOSE_MODE, ENV_LOG_FORMAT, ENV_LOG_LEVEL};

pub const CONFIG_DIR_NAME: &str = "holder";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Path of the config file this loader reads; `None` when no config dir is known
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.base_path {
            Some(base) => Some(base.join(CONFIG_FILE_NAME)),
            None => dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
        }
    }

    /// Load complete configuration; a missing file means defaults
    pub fn load_config(&self) -> Result<HolderConfig, ConfigError> {
        let partial = match self.config_path() {
            Some(path) => self.load_partial_config(&path)?,
            None => None,
        };
        HolderConfig::from_partial_and_env(partial, &self.collect_env_vars())
    }

    /// Load an explicit file, which must exist
    pub fn load_file(&self, path: &PathBuf) -> Result<HolderConfig, ConfigError> {
        let partial = self.read_partial(path)?;
        HolderConfig::from_partial_and_env(Some(partial), &self.collect_env_vars())
    }

    fn load_partial_config(&self, config_path: &PathBuf) -> Result<Option<PartialHolderConfig>, ConfigError> {
        if !config_path.exists() {
            tracing::debug!(path = ?config_path, "no config file, using defaults");
            return Ok(None);
        }
        self.read_partial(config_path).map(Some)
    }

    fn read_partial(&self, config_path: &PathBuf) -> Result<PartialHolderConfig, ConfigError> {
        let display = config_path.to_string_lossy().to_string();
        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::FileRead(display.clone(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlParse(display, e))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let env_keys = [ENV_LOG_LEVEL, ENV_LOG_FORMAT, ENV_CLOSE_MODE];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::CloseMode;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());
        assert_eq!(loader.config_path().unwrap(), dir.path().join(CONFIG_FILE_NAME));

        let partial = loader
            .load_partial_config(&loader.config_path().unwrap())
            .unwrap();
        assert!(partial.is_none());
    }

    #[test]
    fn test_reads_file_from_base_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[close]\nmode = \"exhaustive\"\n",
        )
        .unwrap();
        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());

        let partial = loader
            .load_partial_config(&loader.config_path().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(partial.close.unwrap().mode, Some(CloseMode::Exhaustive));
    }

    #[test]
    fn test_broken_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[close\n").unwrap();

        let err = ConfigLoader::new().load_file(&path).unwrap_err();
        match err {
            ConfigError::TomlParse(p, _) => assert!(p.ends_with(CONFIG_FILE_NAME)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .load_file(&dir.path().join("nope.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(..)));
    }
}
