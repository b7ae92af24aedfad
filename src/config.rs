//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::intake::CompletenessPolicy;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Path of the classifier artifact. Loaded once at startup.
    pub model_path: PathBuf,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// HTTP port.
    pub port: u16,
    /// Whether prediction needs every feature entered first.
    pub completeness: CompletenessPolicy,
    /// Sessions untouched for this long are dropped.
    pub session_idle_timeout: Duration,
    /// How often idle sessions are swept.
    pub prune_interval: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("voting_classifier_model.json"),
            bind_addr: "0.0.0.0".to_string(),
            port: 8501,
            completeness: CompletenessPolicy::Permissive,
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            prune_interval: Duration::from_secs(60),
        }
    }
}

impl IntakeConfig {
    /// Read overrides from the environment. Unparseable values keep the
    /// default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let model_path = std::env::var("INTAKE_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let bind_addr = std::env::var("INTAKE_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let port: u16 = std::env::var("INTAKE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let completeness = match std::env::var("INTAKE_REQUIRE_COMPLETE").ok().as_deref() {
            Some(v) if parse_flag(v) => CompletenessPolicy::RequireAll,
            _ => defaults.completeness,
        };

        let session_idle_timeout = std::env::var("INTAKE_SESSION_IDLE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_idle_timeout);

        Self {
            model_path,
            bind_addr,
            port,
            completeness,
            session_idle_timeout,
            prune_interval: defaults.prune_interval,
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_MODEL_PATH".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_BIND_ADDR".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.session_idle_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_SESSION_IDLE_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        // tokio::time::interval panics on a zero period
        if self.prune_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "prune_interval".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// `addr:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
