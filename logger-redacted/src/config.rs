// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub log_level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
    /// Hash patient identifiers before they reach a log line
    pub redaction_enabled: bool,
    /// Salt mixed into identifier hashes
    pub redaction_salt: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            redaction_enabled: true,
            redaction_salt: "diagnosis-engine".to_string(),
        }
    }
}
