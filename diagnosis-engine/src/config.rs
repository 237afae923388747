use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::error::{DiagnosisError, Result};
use crate::types::ModalityKind;

/// How the coordinator invokes the requested modalities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPolicy {
    /// Fan out every call concurrently
    #[default]
    Parallel,
    /// One call at a time, for constrained upstream capacity
    Sequential,
}

impl FromStr for DispatchPolicy {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(DispatchPolicy::Parallel),
            "sequential" => Ok(DispatchPolicy::Sequential),
            other => Err(DiagnosisError::Configuration(format!(
                "Unknown dispatch policy: {other}"
            ))),
        }
    }
}

/// Fusion weight per modality
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ModalityWeights {
    #[validate(range(min = 0.0))]
    pub looking: f64,
    #[validate(range(min = 0.0))]
    pub listening: f64,
    #[validate(range(min = 0.0))]
    pub inquiry: f64,
    #[validate(range(min = 0.0))]
    pub palpation: f64,
    #[validate(range(min = 0.0))]
    pub calculation: f64,
}

impl Default for ModalityWeights {
    fn default() -> Self {
        Self {
            looking: 1.0,
            listening: 1.0,
            inquiry: 1.5,
            palpation: 1.0,
            calculation: 0.8,
        }
    }
}

impl ModalityWeights {
    pub fn weight(&self, modality: ModalityKind) -> f64 {
        match modality {
            ModalityKind::Looking => self.looking,
            ModalityKind::Listening => self.listening,
            ModalityKind::Inquiry => self.inquiry,
            ModalityKind::Palpation => self.palpation,
            ModalityKind::Calculation => self.calculation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyndromeSettings {
    /// Normalized score (0-100) at which a pattern becomes primary
    #[validate(range(min = 0.0, max = 100.0))]
    pub primary_threshold: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub secondary_threshold: f64,
    #[validate(range(min = 1))]
    pub max_primary: usize,
    #[validate(range(min = 1))]
    pub max_secondary: usize,
    #[validate(range(min = 1))]
    pub max_treatment_principles: usize,
}

impl Default for SyndromeSettings {
    fn default() -> Self {
        Self {
            primary_threshold: 70.0,
            secondary_threshold: 40.0,
            max_primary: 3,
            max_secondary: 5,
            max_treatment_principles: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConstitutionSettings {
    #[validate(range(min = 0.0, max = 100.0))]
    pub dominant_threshold: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub tendency_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_confidence: f64,
    #[validate(range(min = 1))]
    pub max_tendencies: usize,
}

impl Default for ConstitutionSettings {
    fn default() -> Self {
        Self {
            dominant_threshold: 60.0,
            tendency_threshold: 40.0,
            min_confidence: 0.5,
            max_tendencies: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecommendationSettings {
    #[validate(range(min = 1))]
    pub max_per_session: usize,
    /// Results below this confidence do not produce result-derived advice
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_result_confidence: f64,
    #[validate(range(min = 1))]
    pub validity_days: u32,
    #[validate(range(min = 1))]
    pub plan_validity_days: u32,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            max_per_session: 10,
            min_result_confidence: 0.5,
            validity_days: 30,
            plan_validity_days: 30,
        }
    }
}

/// Location of one modality service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EndpointConfig {
    #[validate(length(min = 1))]
    pub base_url: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoints {
    pub looking: Option<EndpointConfig>,
    pub listening: Option<EndpointConfig>,
    pub inquiry: Option<EndpointConfig>,
    pub palpation: Option<EndpointConfig>,
    pub calculation: Option<EndpointConfig>,
}

impl ServiceEndpoints {
    pub fn get(&self, modality: ModalityKind) -> Option<&EndpointConfig> {
        match modality {
            ModalityKind::Looking => self.looking.as_ref(),
            ModalityKind::Listening => self.listening.as_ref(),
            ModalityKind::Inquiry => self.inquiry.as_ref(),
            ModalityKind::Palpation => self.palpation.as_ref(),
            ModalityKind::Calculation => self.calculation.as_ref(),
        }
    }

    /// HTTP timeout for a modality service when the endpoint sets none
    pub fn default_timeout(modality: ModalityKind) -> Duration {
        match modality {
            ModalityKind::Calculation => Duration::from_secs(45),
            _ => Duration::from_secs(30),
        }
    }
}

/// Settings for the whole fusion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FusionConfig {
    pub dispatch_policy: DispatchPolicy,
    #[validate(range(min = 1))]
    pub default_timeout_ms: u64,
    #[validate(nested)]
    pub modality_weights: ModalityWeights,
    #[validate(nested)]
    pub syndrome: SyndromeSettings,
    #[validate(nested)]
    pub constitution: ConstitutionSettings,
    #[validate(nested)]
    pub recommendation: RecommendationSettings,
    pub services: ServiceEndpoints,
    pub logging: LoggerConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            dispatch_policy: DispatchPolicy::default(),
            default_timeout_ms: 30_000,
            modality_weights: ModalityWeights::default(),
            syndrome: SyndromeSettings::default(),
            constitution: ConstitutionSettings::default(),
            recommendation: RecommendationSettings::default(),
            services: ServiceEndpoints::default(),
            logging: LoggerConfig::default(),
        }
    }
}

impl FusionConfig {
    /// Load configuration from an optional file layered under environment
    /// variables prefixed `DIAGNOSIS__` (e.g. `DIAGNOSIS__DISPATCH_POLICY`).
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosisError::Configuration`] when a source cannot be read,
    /// does not deserialize, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DIAGNOSIS")
                .separator("__")
                .try_parsing(true),
        );

        let config: FusionConfig = builder.build()?.try_deserialize()?;
        config.validate_config()?;
        Ok(config)
    }

    /// Load configuration from flat environment variables
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosisError::Configuration`] for an unknown dispatch policy,
    /// a non-numeric timeout or cap, or values that fail validation.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let dispatch_policy = match std::env::var("DIAGNOSIS_DISPATCH_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.dispatch_policy,
        };

        let default_timeout_ms = env_number(
            "DIAGNOSIS_TIMEOUT_MS",
            std::env::var("DIAGNOSIS_TIMEOUT_MS").ok(),
            defaults.default_timeout_ms,
        )?;

        let max_per_session = env_number(
            "DIAGNOSIS_MAX_RECOMMENDATIONS",
            std::env::var("DIAGNOSIS_MAX_RECOMMENDATIONS").ok(),
            defaults.recommendation.max_per_session,
        )?;

        let log_level = std::env::var("DIAGNOSIS_LOG_LEVEL").unwrap_or(defaults.logging.log_level);

        let config = Self {
            dispatch_policy,
            default_timeout_ms,
            recommendation: RecommendationSettings {
                max_per_session,
                ..defaults.recommendation
            },
            logging: LoggerConfig {
                log_level,
                ..defaults.logging
            },
            ..Self::default()
        };
        config.validate_config()?;
        Ok(config)
    }

    /// Range checks plus rules that span several fields
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosisError::Configuration`] describing the violation.
    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| DiagnosisError::Configuration(e.to_string()))?;

        if self.syndrome.primary_threshold < self.syndrome.secondary_threshold {
            return Err(DiagnosisError::Configuration(
                "syndrome primary_threshold must not be below secondary_threshold".to_string(),
            ));
        }
        if self.constitution.dominant_threshold < self.constitution.tendency_threshold {
            return Err(DiagnosisError::Configuration(
                "constitution dominant_threshold must not be below tendency_threshold".to_string(),
            ));
        }
        for modality in ModalityKind::ALL {
            if let Some(endpoint) = self.services.get(modality) {
                endpoint
                    .validate()
                    .map_err(|e| DiagnosisError::Configuration(format!("services.{modality}: {e}")))?;
            }
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Call budget for a modality when the request sets none: the endpoint's
    /// own timeout, else the longer of the global default and the service default
    pub fn modality_timeout(&self, modality: ModalityKind) -> Duration {
        self.services
            .get(modality)
            .and_then(|endpoint| endpoint.timeout_ms)
            .map_or_else(
                || self.default_timeout().max(ServiceEndpoints::default_timeout(modality)),
                Duration::from_millis,
            )
    }
}

fn env_number<T: std::str::FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DiagnosisError::Configuration(format!("{name} is not a valid number: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FusionConfig::default();
        assert!(config.validate_config().is_ok());
        assert_eq!(config.dispatch_policy, DispatchPolicy::Parallel);
        assert_eq!(config.default_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_inquiry_weighted_highest_calculation_lowest() {
        let weights = ModalityWeights::default();
        for modality in ModalityKind::ALL {
            assert!(weights.weight(ModalityKind::Inquiry) >= weights.weight(modality));
            assert!(weights.weight(ModalityKind::Calculation) <= weights.weight(modality));
        }
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = FusionConfig::default();
        config.syndrome.primary_threshold = 30.0;
        assert!(matches!(
            config.validate_config(),
            Err(DiagnosisError::Configuration(_))
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut config = FusionConfig::default();
        config.constitution.min_confidence = 1.5;
        assert!(config.validate_config().is_err());

        let mut config = FusionConfig::default();
        config.recommendation.max_per_session = 0;
        assert!(config.validate_config().is_err());

        let mut config = FusionConfig::default();
        config.modality_weights.inquiry = -1.0;
        assert!(config.validate_config().is_err());
    }

    #[test]
    fn test_dispatch_policy_parsing() {
        assert_eq!("Sequential".parse::<DispatchPolicy>().unwrap(), DispatchPolicy::Sequential);
        assert!("round-robin".parse::<DispatchPolicy>().is_err());
    }

    #[test]
    fn test_config_deserializes_partial_yaml_shape() {
        let json = serde_json::json!({
            "dispatch_policy": "sequential",
            "syndrome": { "primary_threshold": 75.0 },
            "services": { "inquiry": { "base_url": "http://inquiry:8080" } }
        });
        let config: FusionConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.dispatch_policy, DispatchPolicy::Sequential);
        assert_eq!(config.syndrome.primary_threshold, 75.0);
        assert_eq!(config.syndrome.secondary_threshold, 40.0);
        assert!(config.services.get(ModalityKind::Inquiry).is_some());
        assert!(config.services.get(ModalityKind::Looking).is_none());
    }

    #[test]
    fn test_calculation_service_gets_longer_timeout() {
        assert_eq!(
            ServiceEndpoints::default_timeout(ModalityKind::Calculation),
            Duration::from_secs(45)
        );
        assert_eq!(
            ServiceEndpoints::default_timeout(ModalityKind::Inquiry),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_malformed_numeric_env_rejected() {
        assert_eq!(env_number("DIAGNOSIS_TIMEOUT_MS", None, 30_000u64).unwrap(), 30_000);
        assert_eq!(
            env_number("DIAGNOSIS_TIMEOUT_MS", Some(" 1500 ".to_string()), 30_000u64).unwrap(),
            1500
        );

        let err = env_number("DIAGNOSIS_MAX_RECOMMENDATIONS", Some("ten".to_string()), 10usize);
        assert!(matches!(
            err,
            Err(DiagnosisError::Configuration(message)) if message.contains("DIAGNOSIS_MAX_RECOMMENDATIONS")
        ));
        assert!(env_number("DIAGNOSIS_TIMEOUT_MS", Some("-5".to_string()), 30_000u64).is_err());
    }

    #[test]
    fn test_modality_timeout_per_service() {
        let mut config = FusionConfig::default();
        assert_eq!(config.modality_timeout(ModalityKind::Calculation), Duration::from_secs(45));
        assert_eq!(config.modality_timeout(ModalityKind::Inquiry), Duration::from_secs(30));

        config.services.inquiry = Some(EndpointConfig {
            base_url: "http://inquiry:8080".to_string(),
            timeout_ms: Some(5_000),
        });
        assert_eq!(config.modality_timeout(ModalityKind::Inquiry), Duration::from_secs(5));

        config.default_timeout_ms = 60_000;
        assert_eq!(config.modality_timeout(ModalityKind::Calculation), Duration::from_secs(60));
    }
}
