//! # Configuration
//!
//! Settings come from an optional `config.toml`, overridden by environment
//! variables (nested keys use `__`, e.g. `SERVICEBUS__ENTITY_NAME`). A `.env`
//! file in the working directory is loaded first.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub mod app;
pub mod azure;
pub mod limits;
pub mod validation;

pub use app::AppConfig;
pub use azure::{EMULATOR_CONNECTION_STRING, ServicebusConfig};
pub use validation::{ConfigLoadResult, ConfigValidationError};

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Logging configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref().filter(|f| !f.trim().is_empty())
    }
}

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when no
/// path is given. An explicit path must exist; the default file is optional.
pub fn load_config(path: Option<&Path>) -> ConfigLoadResult {
    dotenv::dotenv().ok();

    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let env_source = Environment::default().separator("__");
    let config = match Config::builder()
        .add_source(file)
        .add_source(env_source)
        .build()
    {
        Ok(config) => config,
        Err(e) => return ConfigLoadResult::LoadError(e.to_string()),
    };

    match config.try_deserialize::<AppConfig>() {
        Ok(app_config) => {
            log::debug!("Configuration loaded");
            ConfigLoadResult::Success(Box::new(app_config))
        }
        Err(e) => ConfigLoadResult::DeserializeError(e.to_string()),
    }
}
