use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::ratings::domain::{Rater, RaterId};

const DEFAULT_RATERS: &str = "primary:You,secondary:Partner";
const DEFAULT_DATA_PATH: &str = "data/ratings.json";

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
    pub store: StoreConfig,
    pub raters: Vec<Rater>,
    pub seed_default_criteria: bool,
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
        let ansi = parse_flag("APP_LOG_ANSI", false)?;

        let backend = StoreBackend::parse(
            &env::var("RATINGS_STORE").unwrap_or_else(|_| "memory".to_string()),
        )?;
        let data_path = env::var("RATINGS_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let raters =
            parse_raters(&env::var("RATINGS_RATERS").unwrap_or_else(|_| DEFAULT_RATERS.into()))?;
        let seed_default_criteria = parse_flag("RATINGS_SEED_CRITERIA", true)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            store: StoreConfig { backend, data_path },
            raters,
            seed_default_criteria,
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
    pub ansi: bool,
}

/// Which rating store backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            other => Err(ConfigError::InvalidStoreBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_path: PathBuf,
}

/// Parses `id:label` pairs separated by commas. A bare `id` uses the id as its label.
fn parse_raters(raw: &str) -> Result<Vec<Rater>, ConfigError> {
    let mut raters: Vec<Rater> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (id, label) = match entry.split_once(':') {
            Some((id, label)) => (id.trim(), label.trim()),
            None => (entry, entry),
        };

        if id.is_empty() || label.is_empty() {
            return Err(ConfigError::InvalidRaters(raw.to_string()));
        }
        if raters.iter().any(|rater| rater.id.0 == id) {
            return Err(ConfigError::InvalidRaters(raw.to_string()));
        }

        raters.push(Rater {
            id: RaterId(id.to_string()),
            username: id.to_string(),
            label: label.to_string(),
        });
    }

    if raters.is_empty() {
        return Err(ConfigError::InvalidRaters(raw.to_string()));
    }

    Ok(raters)
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStoreBackend(String),
    InvalidRaters(String),
    InvalidFlag { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStoreBackend(value) => {
                write!(f, "RATINGS_STORE must be 'memory' or 'file', got '{value}'")
            }
            ConfigError::InvalidRaters(value) => write!(
                f,
                "RATINGS_RATERS must list unique 'id:label' pairs, got '{value}'"
            ),
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidStoreBackend(_)
            | ConfigError::InvalidRaters(_)
            | ConfigError::InvalidFlag { .. } => None,
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_ANSI",
            "RATINGS_STORE",
            "RATINGS_DATA_PATH",
            "RATINGS_RATERS",
            "RATINGS_SEED_CRITERIA",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.telemetry.ansi);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.data_path, PathBuf::from("data/ratings.json"));
        assert!(config.seed_default_criteria);

        let ids: Vec<&str> = config.raters.iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(ids, vec!["primary", "secondary"]);
        assert_eq!(config.raters[1].label, "Partner");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_file_backend_and_custom_raters() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RATINGS_STORE", "file");
        env::set_var("RATINGS_DATA_PATH", "/tmp/ratings-test.json");
        env::set_var("RATINGS_RATERS", "alex:Alex, sam");
        env::set_var("RATINGS_SEED_CRITERIA", "no");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(
            config.store.data_path,
            PathBuf::from("/tmp/ratings-test.json")
        );
        assert_eq!(config.raters.len(), 2);
        assert_eq!(config.raters[0].label, "Alex");
        assert_eq!(config.raters[1].id.0, "sam");
        assert_eq!(config.raters[1].label, "sam");
        assert!(!config.seed_default_criteria);
        reset_env();
    }

    #[test]
    fn rejects_unknown_backend_and_duplicate_raters() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RATINGS_STORE", "postgres");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidStoreBackend(_))
        ));

        reset_env();
        env::set_var("RATINGS_RATERS", "a:One,a:Two");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidRaters(_))
        ));
        reset_env();
    }
}
