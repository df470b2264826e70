use crate::config::TelemetryConfig;
use std::fmt;
use tracing::debug;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    InvalidDirective { directive: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDirective { directive, .. } => {
                write!(f, "APP_LOG_LEVEL '{directive}' is not a valid tracing filter")
            }
            Self::AlreadyInstalled(err) => {
                write!(f, "could not install the tracing subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidDirective { source, .. } => Some(source),
            Self::AlreadyInstalled(err) => Some(err.as_ref()),
        }
    }
}

/// Where the active log filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    RustLog,
    Config,
}

/// `RUST_LOG` takes precedence; otherwise the configured level is parsed as a directive.
pub fn env_filter(config: &TelemetryConfig) -> Result<(EnvFilter, FilterSource), TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok((filter, FilterSource::RustLog));
    }

    EnvFilter::try_new(&config.log_level)
        .map(|filter| (filter, FilterSource::Config))
        .map_err(|source| TelemetryError::InvalidDirective {
            directive: config.log_level.clone(),
            source,
        })
}

/// Installs the global compact subscriber. Only the first call in a process succeeds.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let (filter, filter_source) = env_filter(config)?;

    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_ansi(config.ansi)
        .with_env_filter(filter)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)?;

    debug!(?filter_source, ansi = config.ansi, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_without_rust_log() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = TelemetryConfig {
            log_level: "state_ratings=debug,info".to_string(),
            ansi: false,
        };
        let (_, source) = env_filter(&config).expect("valid directive");
        assert_eq!(source, FilterSource::Config);
    }

    #[test]
    fn rejects_malformed_filter_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = TelemetryConfig {
            log_level: "state_ratings=loudest".to_string(),
            ansi: false,
        };

        match env_filter(&config) {
            Err(TelemetryError::InvalidDirective { directive, .. }) => {
                assert_eq!(directive, "state_ratings=loudest")
            }
            Err(other) => panic!("expected directive error, got {other}"),
            Ok(_) => panic!("directive should not parse"),
        }
    }
}
