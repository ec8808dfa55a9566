pub mod loader;

use std::collections::HashMap;

use serde::Deserialize;
use tracing::Level;

use crate::errors::ConfigError;
use crate::infrastructure::container::CloseMode;
use crate::logging::{LogFormat, LoggingConfig};

pub use loader::ConfigLoader;

pub const ENV_LOG_LEVEL: &str = "HOLDER_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "HOLDER_LOG_FORMAT";
pub const ENV_CLOSE_MODE: &str = "HOLDER_CLOSE_MODE";

/// Logging section as written in the TOML file
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PartialLoggingConfig {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
    pub show_target: Option<bool>,
    pub show_thread_ids: Option<bool>,
    pub ansi: Option<bool>,
}

/// Teardown section as written in the TOML file
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PartialCloseConfig {
    pub mode: Option<CloseMode>,
}

/// Raw file contents; every field is optional
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PartialHolderConfig {
    pub logging: Option<PartialLoggingConfig>,
    pub close: Option<PartialCloseConfig>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone, Default)]
pub struct HolderConfig {
    pub logging: LoggingConfig,
    pub close_mode: CloseMode,
}

fn parse_level(value: &str) -> Result<Level, ConfigError> {
    value.parse::<Level>().map_err(|_| ConfigError::InvalidValue {
        field: "logging.level",
        value: value.to_string(),
    })
}

fn parse_close_mode(value: &str) -> Result<CloseMode, ConfigError> {
    match value.to_ascii_lowercase().replace('-', "_").as_str() {
        "fail_fast" => Ok(CloseMode::FailFast),
        "exhaustive" => Ok(CloseMode::Exhaustive),
        _ => Err(ConfigError::InvalidValue {
            field: "close.mode",
            value: value.to_string(),
        }),
    }
}

impl HolderConfig {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let partial: PartialHolderConfig = toml::from_str(content)
            .map_err(|e| ConfigError::TomlParse("<inline>".to_string(), e))?;
        Self::from_partial_and_env(Some(partial), &HashMap::new())
    }

    /// Merge file values with environment values; environment wins
    pub fn from_partial_and_env(
        partial: Option<PartialHolderConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let file_logging = partial.logging.unwrap_or_default();
        let mut logging = LoggingConfig::default();

        if let Some(level) = env_map.get(ENV_LOG_LEVEL).or(file_logging.level.as_ref()) {
            logging.level = parse_level(level)?;
        }
        logging.format = match env_map.get(ENV_LOG_FORMAT) {
            Some(format) => format.parse()?,
            None => file_logging.format.unwrap_or(logging.format),
        };
        logging.show_target = file_logging.show_target.unwrap_or(logging.show_target);
        logging.show_thread_ids = file_logging.show_thread_ids.unwrap_or(logging.show_thread_ids);
        logging.ansi = file_logging.ansi.unwrap_or(logging.ansi);

        let close_mode = match env_map.get(ENV_CLOSE_MODE) {
            Some(mode) => parse_close_mode(mode)?,
            None => partial.close.and_then(|c| c.mode).unwrap_or_default(),
        };

        Ok(Self {
            logging,
            close_mode,
        })
    }
}
