use crate::health::DEFAULT_CALIBRATION_VERSION;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_CALIBRATOR_PATH: &str = "models/contract_health_calibrator.json";
const DEFAULT_BANDS_PATH: &str = "config/contract_health_bands.json";

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
    pub preflight: PreflightConfig,
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

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            preflight: PreflightConfig::from_env(),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the rule, calibration and account documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightConfig {
    /// `None` selects the bundled rules.
    pub contract_rules_path: Option<PathBuf>,
    pub calibrator_path: PathBuf,
    pub bands_path: PathBuf,
    pub calibration_version: String,
    pub account_csv: Option<PathBuf>,
    pub house_aliases: Vec<String>,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            contract_rules_path: None,
            calibrator_path: PathBuf::from(DEFAULT_CALIBRATOR_PATH),
            bands_path: PathBuf::from(DEFAULT_BANDS_PATH),
            calibration_version: DEFAULT_CALIBRATION_VERSION.to_string(),
            account_csv: None,
            house_aliases: Vec::new(),
        }
    }
}

impl PreflightConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            contract_rules_path: non_empty_var("PREFLIGHT_CONTRACT_RULES_JSON").map(PathBuf::from),
            calibrator_path: non_empty_var("CONTRACT_HEALTH_CALIBRATOR_JSON")
                .map_or(defaults.calibrator_path, PathBuf::from),
            bands_path: non_empty_var("CONTRACT_HEALTH_BANDS_CONFIG")
                .map_or(defaults.bands_path, PathBuf::from),
            calibration_version: non_empty_var("CONTRACT_HEALTH_CALIBRATION_VERSION")
                .unwrap_or(defaults.calibration_version),
            account_csv: non_empty_var("PREFLIGHT_ACCOUNT_CSV").map(PathBuf::from),
            house_aliases: non_empty_var("PREFLIGHT_HOUSE_ALIASES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
