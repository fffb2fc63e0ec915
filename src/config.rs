//! Startup configuration, read from the environment (and `.env` when present).

use chrono::Datelike;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
    /// Intake year used when a submitted form leaves it out.
    pub default_intake_year: i32,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace = std::env::var("ADMISSIOND_WORKSPACE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let default_intake_year = match std::env::var("ADMISSIOND_INTAKE_YEAR") {
            Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<i32>().map_err(|e| {
                ConfigError::InvalidValue("ADMISSIOND_INTAKE_YEAR".to_string(), e.to_string())
            })?,
            _ => chrono::Local::now().year(),
        };
        if default_intake_year <= 0 {
            return Err(ConfigError::InvalidValue(
                "ADMISSIOND_INTAKE_YEAR".to_string(),
                "must be a positive year".to_string(),
            ));
        }

        let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(AppConfig {
            workspace,
            default_intake_year,
            log_filter,
        })
    }
}
