//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod approval;
pub mod database;
pub mod logging;

use serde::{Deserialize, Serialize};

pub use self::approval::ApprovalConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Approval workflow settings.
    #[serde(default)]
    pub approval: ApprovalConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `APPROVAL__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("APPROVAL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("approval.exempt_entity_types"),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        tracing::debug!(env, "Configuration loaded");
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::configuration(
                "database.min_connections must not exceed database.max_connections",
            ));
        }
        if self.approval.max_comment_length == 0 {
            return Err(AppError::configuration(
                "approval.max_comment_length must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://localhost/approvals" }
        }))
        .expect("config should deserialize")
    }

    #[test]
    fn test_sections_fall_back_to_defaults() {
        let config = sample();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.logging.level, "info");
        assert!(config.approval.require_approval_by_default);
        assert_eq!(config.approval.max_comment_length, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_pool_bounds() {
        let mut config = sample();
        config.database.min_connections = 50;
        assert!(config.validate().is_err());
    }
}
