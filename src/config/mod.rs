use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::scoring::DEFAULT_FEATURES;

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

    pub fn label(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            model: ModelConfig::from_env()?,
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

/// Where the trained artifacts live and how their output is interpreted.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    /// Decision threshold reported in model metadata and used for churn rates.
    pub threshold: f64,
    pub feature_names: Vec<String>,
}

impl ModelConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let model_path = env::var("CHURN_MODEL_PATH")
            .unwrap_or_else(|_| "./models/churn_model.json".to_string());
        let scaler_path =
            env::var("CHURN_SCALER_PATH").unwrap_or_else(|_| "./models/scaler.json".to_string());

        let threshold = env::var("CHURN_MODEL_THRESHOLD")
            .unwrap_or_else(|_| "0.5".to_string())
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| (0.0..=1.0).contains(value))
            .ok_or(ConfigError::InvalidThreshold)?;

        let feature_names = match env::var("CHURN_FEATURES") {
            Ok(raw) => parse_feature_list(&raw)?,
            Err(_) => DEFAULT_FEATURES.iter().map(|name| name.to_string()).collect(),
        };

        Ok(Self {
            model_path: PathBuf::from(model_path),
            scaler_path: PathBuf::from(scaler_path),
            threshold,
            feature_names,
        })
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/churn_model.json"),
            scaler_path: PathBuf::from("./models/scaler.json"),
            threshold: 0.5,
            feature_names: DEFAULT_FEATURES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

fn parse_feature_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if names.iter().any(|existing| existing == name) {
            return Err(ConfigError::DuplicateFeature(name.to_string()));
        }
        names.push(name.to_string());
    }

    if names.is_empty() {
        return Err(ConfigError::EmptyFeatureList);
    }
    Ok(names)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThreshold,
    EmptyFeatureList,
    DuplicateFeature(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThreshold => {
                write!(f, "CHURN_MODEL_THRESHOLD must be a number between 0 and 1")
            }
            ConfigError::EmptyFeatureList => {
                write!(f, "CHURN_FEATURES must name at least one feature")
            }
            ConfigError::DuplicateFeature(name) => {
                write!(f, "CHURN_FEATURES lists '{name}' more than once")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidThreshold
            | ConfigError::EmptyFeatureList
            | ConfigError::DuplicateFeature(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("CHURN_MODEL_PATH");
        env::remove_var("CHURN_SCALER_PATH");
        env::remove_var("CHURN_MODEL_THRESHOLD");
        env::remove_var("CHURN_FEATURES");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.model.threshold, 0.5);
        assert_eq!(config.model.feature_names.len(), DEFAULT_FEATURES.len());
        assert_eq!(
            config.model.model_path,
            PathBuf::from("./models/churn_model.json")
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8000));
        reset_env();
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CHURN_MODEL_THRESHOLD", "1.5");
        let err = AppConfig::load().expect_err("threshold above one rejected");
        assert!(matches!(err, ConfigError::InvalidThreshold));
        reset_env();
    }

    #[test]
    fn feature_list_override_keeps_declared_order() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CHURN_FEATURES", " gastos, ingresos ,deuda_total,");
        env::set_var("APP_ENV", "prod");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(
            config.model.feature_names,
            vec!["gastos", "ingresos", "deuda_total"]
        );
        reset_env();
    }

    #[test]
    fn duplicate_feature_names_are_rejected() {
        assert!(matches!(
            parse_feature_list("ingresos,gastos,ingresos"),
            Err(ConfigError::DuplicateFeature(name)) if name == "ingresos"
        ));
        assert!(matches!(
            parse_feature_list(" , "),
            Err(ConfigError::EmptyFeatureList)
        ));
    }
}
