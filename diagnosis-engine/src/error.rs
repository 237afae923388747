use thiserror::Error;

/// Errors surfaced to callers of the diagnosis pipeline.
///
/// Per-modality failures never appear here; they are recorded on the
/// corresponding [`crate::DiagnosisResult`] instead.
#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No modality clients configured")]
    NoModalityClients,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for DiagnosisError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<config::ConfigError> for DiagnosisError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiagnosisError>;
