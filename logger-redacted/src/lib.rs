//! Structured logging for the diagnosis engine.
//!
//! Diagnostic sessions are tied to real patients, so the pipeline never writes
//! a user or session identifier to a log line in clear text. This crate
//! installs the process-wide `tracing` subscriber and provides the
//! [`IdentifierRedactor`] every component uses for identifier fields.
//!
//! # Key Features
//!
//! - **EnvFilter driven**: `RUST_LOG` wins over the configured level
//! - **JSON output**: optional line-delimited JSON for log shippers
//! - **Hash-based Correlation**: redacted identifiers are salted SHA-256
//!   prefixes, so the same patient maps to the same token across lines
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{init_logging, IdentifierRedactor, LoggerConfig};
//! use tracing::info;
//!
//! let config = LoggerConfig::default();
//! init_logging(&config).ok();
//!
//! let redactor = IdentifierRedactor::new(&config);
//! info!(user = %redactor.redact("user-123"), "Diagnosis started");
//! ```

pub mod config;
pub mod error;
pub mod redactor;

pub use config::*;
pub use error::*;
pub use redactor::*;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Calling this more than once is harmless: when a subscriber is already
/// installed the existing one is kept.
///
/// # Errors
///
/// Returns [`LoggerError::InvalidFilter`] when neither `RUST_LOG` nor the
/// configured level is a valid filter directive.
pub fn init_logging(config: &LoggerConfig) -> LoggerResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| LoggerError::InvalidFilter {
            directive: config.log_level.clone(),
            reason: e.to_string(),
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_ok() {
        tracing::debug!(
            level = %config.log_level,
            json = config.json,
            redaction = config.redaction_enabled,
            "Logging initialized"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggerConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
