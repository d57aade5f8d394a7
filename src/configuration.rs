use std::path::{Path, PathBuf};

use config::{Config, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Deserialize)]
pub struct Settings {
    /// Filled from `APP_ENVIRONMENT`, not from the files.
    #[serde(skip)]
    pub environment: Environment,
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub search: SearchSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Postgres for records, Redis for sessions.
    Postgres,
    /// Everything kept in process; lost on restart.
    Memory,
}

#[derive(serde::Deserialize)]
pub struct ApplicationSettings {
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    pub jwt_secret: SecretString,

    pub storage: StorageBackend,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: SecretString,
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db()
            .database(&self.database_name)
            .log_statements(tracing_log::log::LevelFilter::Trace)
    }

    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }
}

#[derive(serde::Deserialize)]
pub struct RedisSettings {
    pub url: SecretString,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub session_ttl_seconds: i64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key_path: PathBuf,
    pub search_engine_id_path: PathBuf,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_seconds: u64,
}

#[derive(serde::Deserialize, Default)]
pub struct TelemetrySettings {
    /// OTLP gRPC collector; spans are only exported when this is set.
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Local,
    Production,
}

impl Environment {
    pub fn to_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {e}")))?;
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    load_settings(&base_path.join("configurations"), environment)
}

/// Layers `base`, then the environment's file, then `APP_*` variables.
pub fn load_settings(
    configuration_directory: &Path,
    environment: Environment,
) -> Result<Settings, config::ConfigError> {
    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base")))
        .add_source(File::from(
            configuration_directory.join(environment.to_str()),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"), // Use double underscore to represent nested struct fields (e.g., APP_DATABASE__USERNAME)
        );

    let mut settings = settings.build()?.try_deserialize::<Settings>()?;
    settings.environment = environment;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names_are_case_insensitive() {
        assert!(matches!(
            Environment::try_from("Production".to_string()),
            Ok(Environment::Production)
        ));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn shipped_configuration_parses() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                include_str!("../configurations/base.yaml"),
                config::FileFormat::Yaml,
            ))
            .add_source(File::from_str(
                include_str!("../configurations/local.yaml"),
                config::FileFormat::Yaml,
            ))
            .build()
            .and_then(|c| c.try_deserialize::<Settings>())
            .expect("configuration should deserialize");

        assert_eq!(settings.application.storage, StorageBackend::Memory);
        assert_eq!(settings.search.timeout_seconds, 5);
        assert!(settings.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn settings_remember_their_environment() {
        let directory = Path::new(env!("CARGO_MANIFEST_DIR")).join("configurations");

        let production = load_settings(&directory, Environment::Production)
            .expect("production configuration should load");
        assert_eq!(production.environment, Environment::Production);
        assert_eq!(production.application.storage, StorageBackend::Postgres);

        let local = load_settings(&directory, Environment::Local)
            .expect("local configuration should load");
        assert_eq!(local.environment, Environment::Local);
    }
}
