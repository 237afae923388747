use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::config::LoggerConfig;

/// Number of digest bytes kept in a redacted identifier
const HASH_PREFIX_BYTES: usize = 8;

/// Replaces patient identifiers with salted hashes so log lines can still be
/// correlated without exposing the identifier itself.
#[derive(Debug, Clone)]
pub struct IdentifierRedactor {
    enabled: bool,
    salt: String,
}

impl IdentifierRedactor {
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            enabled: config.redaction_enabled,
            salt: config.redaction_salt.clone(),
        }
    }

    /// A redactor that passes identifiers through untouched.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            salt: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn redact(&self, value: &str) -> String {
        if !self.enabled {
            return value.to_string();
        }
        if value.is_empty() {
            return "ID[]".to_string();
        }
        format!("ID[{}]", self.hash_value(value))
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(value.as_bytes());
        let digest = hasher.finalize();
        let prefix: Vec<u8> = digest.iter().take(HASH_PREFIX_BYTES).copied().collect();
        general_purpose::URL_SAFE_NO_PAD.encode(prefix)
    }
}

impl Default for IdentifierRedactor {
    fn default() -> Self {
        Self::new(&LoggerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_hashed() {
        let redactor = IdentifierRedactor::default();
        let redacted = redactor.redact("patient-42");
        assert!(redacted.starts_with("ID["));
        assert!(!redacted.contains("patient-42"));
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = IdentifierRedactor::default();
        assert_eq!(redactor.redact("user-1"), redactor.redact("user-1"));
        assert_ne!(redactor.redact("user-1"), redactor.redact("user-2"));
    }

    #[test]
    fn test_salt_changes_hash() {
        let a = IdentifierRedactor::new(&LoggerConfig {
            redaction_salt: "a".to_string(),
            ..Default::default()
        });
        let b = IdentifierRedactor::new(&LoggerConfig {
            redaction_salt: "b".to_string(),
            ..Default::default()
        });
        assert_ne!(a.redact("user-1"), b.redact("user-1"));
    }

    #[test]
    fn test_disabled_passes_through() {
        let redactor = IdentifierRedactor::disabled();
        assert_eq!(redactor.redact("user-1"), "user-1");
        assert!(!redactor.is_enabled());
    }
}
