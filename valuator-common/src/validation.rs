//! Configuration validation.
//!
//! Checks that required values are present and within valid ranges before
//! the service starts listening.

use thiserror::Error;

use crate::config::{
    Config, NarrativeConfig, ObservabilityConfig, ServerConfig, StoreConfig, ValuationSettings,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port} for {field}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ValidationError> = [
            self.server.validate(),
            self.narrative.validate(),
            self.valuation.validate(),
            self.store.validate(),
            self.observability.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Config {
    /// Load, apply environment overrides, and validate.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "server.port".into(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "server.host".into(),
            });
        }
        if self.body_limit_bytes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "server.body_limit_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "server.request_timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

impl Validate for NarrativeConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidValue {
                field: "narrative.temperature".into(),
                reason: "must be between 0.0 and 2.0".into(),
            });
        }
        if self.max_tokens == 0 {
            return Err(ValidationError::InvalidValue {
                field: "narrative.max_tokens".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "narrative.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.deployment.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "narrative.deployment".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ValuationSettings {
    fn validate(&self) -> ValidationResult<()> {
        if !self.wacc.is_finite() || !self.terminal_growth.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: "valuation".into(),
                reason: "wacc and terminal_growth must be finite".into(),
            });
        }
        if self.wacc <= self.terminal_growth {
            return Err(ValidationError::InvalidValue {
                field: "valuation.wacc".into(),
                reason: format!(
                    "must exceed terminal_growth ({} <= {})",
                    self.wacc, self.terminal_growth
                ),
            });
        }
        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.recent_limit == 0 {
            return Err(ValidationError::InvalidValue {
                field: "store.recent_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}
