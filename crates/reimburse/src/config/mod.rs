use crate::model::{ArtifactError, ModelArtifact, ModelConfig, Preset, UnknownPreset};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelSource,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig::from_env(),
            model: ModelSource::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl TelemetryConfig {
    /// Reads `APP_LOG_LEVEL` only, so offline commands never depend on the
    /// server settings.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self { log_level }
    }
}

/// Where the scoring configuration comes from. A persisted artifact wins
/// over a preset name.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Preset(Preset),
    Artifact(PathBuf),
}

impl ModelSource {
    /// `REIMBURSE_MODEL_PATH` when set, otherwise `REIMBURSE_PRESET`, otherwise base.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        match env::var("REIMBURSE_MODEL_PATH") {
            Ok(path) if !path.trim().is_empty() => Ok(ModelSource::Artifact(PathBuf::from(path))),
            _ => {
                let name = env::var("REIMBURSE_PRESET").unwrap_or_else(|_| "base".to_string());
                name.parse()
                    .map(ModelSource::Preset)
                    .map_err(|source| ConfigError::InvalidPreset { source })
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            ModelSource::Preset(preset) => format!("preset:{preset}"),
            ModelSource::Artifact(path) => format!("artifact:{}", path.display()),
        }
    }

    /// Resolves to a validated configuration.
    pub fn load(&self) -> Result<ModelConfig, ArtifactError> {
        match self {
            ModelSource::Preset(preset) => Ok(preset.config()),
            ModelSource::Artifact(path) => ModelArtifact::load(path).map(|artifact| artifact.config),
        }
    }
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::Preset(Preset::Base)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPreset { source: UnknownPreset },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPreset { source } => {
                write!(f, "REIMBURSE_PRESET is not usable: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPreset { source } => Some(source),
        }
    }
}
