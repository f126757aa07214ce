//! Layered configuration
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A config file: the explicit path, else `VERDICT_CONFIG_PATH`, else an
//!    optional `verdict.toml` in the working directory
//! 3. `VERDICT_*` environment variables (`VERDICT_PROGRAM__CLOCK`,
//!    `VERDICT_PROGRAM__TIMEZONE`, `VERDICT_LOGGING__FILTER`), including
//!    ones loaded from `.env`
//! 4. Overrides set on the builder

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::interpreter::ProgramConfig;

const ENV_PREFIX: &str = "VERDICT";
const CONFIG_PATH_VAR: &str = "VERDICT_CONFIG_PATH";
const DEFAULT_FILE: &str = "verdict";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub program: ProgramConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    clock: Option<String>,
    timezone: Option<String>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn clock(mut self, clock: Option<String>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let path = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        let mut builder = config::Config::builder()
            .set_default("logging.filter", LoggingConfig::default().filter)?;

        builder = match &path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        if let Some(clock) = self.clock {
            builder = builder.set_override("program.clock", clock)?;
        }
        if let Some(timezone) = self.timezone {
            builder = builder.set_override("program.timezone", timezone)?;
        }
        if let Some(filter) = self.log_filter {
            builder = builder.set_override("logging.filter", filter)?;
        }

        let source = match &path {
            Some(path) => format!("configuration from {}", path.display()),
            None => "configuration".to_string(),
        };
        builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .with_context(|| format!("Failed to load {}", source))
    }
}
