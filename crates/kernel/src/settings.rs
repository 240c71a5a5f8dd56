use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub use bookshelf_db::DatabaseSettings;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub summarizer: SummarizerSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `BOOKSHELF__SECTION__KEY` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selected environment always wins over file contents.
        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Prefix placed in front of every module mount point, e.g. `/api`.
    #[serde(default)]
    pub api_prefix: String,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            api_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Directive used when `RUST_LOG` is not set.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Connection to the external summarization model.
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerSettings {
    #[serde(default = "SummarizerSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "SummarizerSettings::default_min_length")]
    pub min_length: u32,
    #[serde(default = "SummarizerSettings::default_max_length")]
    pub max_length: u32,
    #[serde(default = "SummarizerSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl SummarizerSettings {
    fn default_endpoint() -> String {
        "http://127.0.0.1:8000/summarize".to_string()
    }

    fn default_min_length() -> u32 {
        30
    }

    fn default_max_length() -> u32 {
        100
    }

    fn default_timeout_ms() -> u64 {
        30000
    }
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            api_token: None,
            min_length: Self::default_min_length(),
            max_length: Self::default_max_length(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}
