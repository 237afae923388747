use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::constitution::ConstitutionAnalysis;
use crate::error::{DiagnosisError, Result};
use crate::modality::ModalityResponse;
use crate::recommendation::{Recommendation, RecommendationPlan};
use crate::syndrome::SyndromeAnalysis;

// ============================================================================
// MODALITIES
// ============================================================================

/// The five diagnostic channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalityKind {
    /// Tongue, face and body inspection
    Looking,
    /// Voice and breathing
    Listening,
    /// Conversational history taking
    Inquiry,
    /// Pulse taking
    Palpation,
    /// Calendrical calculation
    Calculation,
}

impl ModalityKind {
    pub const ALL: [ModalityKind; 5] = [
        ModalityKind::Looking,
        ModalityKind::Listening,
        ModalityKind::Inquiry,
        ModalityKind::Palpation,
        ModalityKind::Calculation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModalityKind::Looking => "looking",
            ModalityKind::Listening => "listening",
            ModalityKind::Inquiry => "inquiry",
            ModalityKind::Palpation => "palpation",
            ModalityKind::Calculation => "calculation",
        }
    }
}

impl fmt::Display for ModalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModalityKind {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "looking" | "look" => Ok(ModalityKind::Looking),
            "listening" | "listen" => Ok(ModalityKind::Listening),
            "inquiry" => Ok(ModalityKind::Inquiry),
            "palpation" => Ok(ModalityKind::Palpation),
            "calculation" => Ok(ModalityKind::Calculation),
            other => Err(DiagnosisError::Validation(format!("Unknown modality: {other}"))),
        }
    }
}

/// Lifecycle of one modality invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Timeout,
}

impl DiagnosisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisStatus::Pending => "pending",
            DiagnosisStatus::InProgress => "in_progress",
            DiagnosisStatus::Completed => "completed",
            DiagnosisStatus::Failed => "failed",
            DiagnosisStatus::Timeout => "timeout",
        }
    }

    /// Whether the invocation has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DiagnosisStatus::Completed | DiagnosisStatus::Failed | DiagnosisStatus::Timeout
        )
    }
}

impl fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// USER PROFILE
// ============================================================================

/// Known conditions that restrict which recommendations may be given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicalCondition {
    Pregnancy,
    Hypertension,
    Diabetes,
    HeartDisease,
    LiverDisease,
    KidneyDisease,
}

impl MedicalCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicalCondition::Pregnancy => "pregnancy",
            MedicalCondition::Hypertension => "hypertension",
            MedicalCondition::Diabetes => "diabetes",
            MedicalCondition::HeartDisease => "heart_disease",
            MedicalCondition::LiverDisease => "liver_disease",
            MedicalCondition::KidneyDisease => "kidney_disease",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u32>,
    #[serde(default)]
    pub medical_conditions: Vec<MedicalCondition>,
}

// ============================================================================
// REQUEST
// ============================================================================

/// Required payload keys per modality; any one of them must be present
fn required_payload_keys(kind: ModalityKind) -> &'static [&'static str] {
    match kind {
        ModalityKind::Looking => &["tongue_image", "face_image", "body_image"],
        ModalityKind::Listening => &["voice_data", "audio_data"],
        ModalityKind::Palpation => &["pulse_data"],
        ModalityKind::Inquiry | ModalityKind::Calculation => &[],
    }
}

/// A request to run a set of modalities for one user session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiagnosisRequest {
    pub request_id: Uuid,
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "session_id must not be empty"))]
    pub session_id: String,
    #[validate(length(min = 1, message = "at least one modality must be requested"))]
    pub modalities: Vec<ModalityKind>,
    /// Opaque per-modality input payloads
    #[serde(default)]
    pub inputs: HashMap<ModalityKind, Value>,
    /// Per-call timeout; the configured default applies when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    pub created_at: DateTime<Utc>,
}

impl DiagnosisRequest {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        modalities: Vec<ModalityKind>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            modalities,
            inputs: HashMap::new(),
            timeout_ms: None,
            user_profile: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_input(mut self, modality: ModalityKind, payload: Value) -> Self {
        self.inputs.insert(modality, payload);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_user_profile(mut self, profile: UserProfile) -> Self {
        self.user_profile = Some(profile);
        self
    }

    /// Timeout for a single modality call
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout_ms.map_or(default, Duration::from_millis)
    }

    /// Payload for one modality, or an empty object when none was supplied
    pub fn input_for(&self, modality: ModalityKind) -> Value {
        self.inputs
            .get(&modality)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Check the request before anything is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosisError::Validation`] describing the first problem found.
    pub fn validate_request(&self) -> Result<()> {
        self.validate()?;

        if self.user_id.trim().is_empty() {
            return Err(DiagnosisError::Validation("user_id must not be blank".to_string()));
        }
        if self.session_id.trim().is_empty() {
            return Err(DiagnosisError::Validation("session_id must not be blank".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(DiagnosisError::Validation("timeout must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for modality in &self.modalities {
            if !seen.insert(*modality) {
                return Err(DiagnosisError::Validation(format!(
                    "modality {modality} requested more than once"
                )));
            }
        }

        for (modality, payload) in &self.inputs {
            if !seen.contains(modality) {
                return Err(DiagnosisError::Validation(format!(
                    "payload supplied for modality {modality} which was not requested"
                )));
            }
            let Some(object) = payload.as_object() else {
                return Err(DiagnosisError::Validation(format!(
                    "payload for {modality} must be a JSON object"
                )));
            };
            let required = required_payload_keys(*modality);
            if !required.is_empty() && !required.iter().any(|key| object.contains_key(*key)) {
                return Err(DiagnosisError::Validation(format!(
                    "payload for {modality} must contain one of: {}",
                    required.join(", ")
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Outcome of one modality invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub result_id: Uuid,
    pub request_id: Uuid,
    pub modality: ModalityKind,
    pub status: DiagnosisStatus,
    pub confidence: f64,
    /// Named feature groups, e.g. `tongue_analysis`, `pulse_analysis`
    pub features: Map<String, Value>,
    pub raw: Value,
    pub error_message: Option<String>,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl DiagnosisResult {
    pub fn completed(
        request_id: Uuid,
        modality: ModalityKind,
        response: ModalityResponse,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            request_id,
            modality,
            status: DiagnosisStatus::Completed,
            confidence: response.confidence,
            features: response.features,
            raw: response.raw,
            error_message: None,
            elapsed_ms,
            started_at,
        }
    }

    pub fn failed(
        request_id: Uuid,
        modality: ModalityKind,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            request_id,
            modality,
            status: DiagnosisStatus::Failed,
            confidence: 0.0,
            features: Map::new(),
            raw: Value::Null,
            error_message: Some(message.into()),
            elapsed_ms,
            started_at,
        }
    }

    pub fn timed_out(
        request_id: Uuid,
        modality: ModalityKind,
        timeout: Duration,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            request_id,
            modality,
            status: DiagnosisStatus::Timeout,
            confidence: 0.0,
            features: Map::new(),
            raw: Value::Null,
            error_message: Some(format!("{modality} timed out after {}ms", timeout.as_millis())),
            elapsed_ms,
            started_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == DiagnosisStatus::Completed
    }

    /// A named feature group as an object, if present
    pub fn feature_group(&self, name: &str) -> Option<&Map<String, Value>> {
        self.features.get(name).and_then(Value::as_object)
    }
}

/// The terminal artifact of one coordination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedDiagnosisResult {
    pub coordination_id: Uuid,
    pub user_id: String,
    pub session_id: String,
    /// Every modality result in request order, failed ones included
    pub results: Vec<DiagnosisResult>,
    pub syndrome_analysis: SyndromeAnalysis,
    pub constitution_analysis: ConstitutionAnalysis,
    pub recommendations: Vec<Recommendation>,
    /// Recommendations removed by contraindication filtering
    pub filtered_recommendations: Vec<Recommendation>,
    pub recommendation_plan: Option<RecommendationPlan>,
    pub overall_confidence: f64,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl FusedDiagnosisResult {
    pub fn completed_results(&self) -> impl Iterator<Item = &DiagnosisResult> {
        self.results.iter().filter(|r| r.is_completed())
    }

    /// True when no modality produced a usable result
    pub fn is_empty(&self) -> bool {
        self.completed_results().next().is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> DiagnosisRequest {
        DiagnosisRequest::new(
            "user-1",
            "session-1",
            vec![ModalityKind::Inquiry, ModalityKind::Looking],
        )
    }

    #[test]
    fn test_valid_request() {
        let req = request()
            .with_input(ModalityKind::Looking, json!({"tongue_image": "b64"}))
            .with_input(ModalityKind::Inquiry, json!({"text": "疲乏"}));
        assert!(req.validate_request().is_ok());
    }

    #[test]
    fn test_empty_user_rejected() {
        let req = DiagnosisRequest::new("", "session-1", vec![ModalityKind::Inquiry]);
        assert!(matches!(req.validate_request(), Err(DiagnosisError::Validation(_))));

        let req = DiagnosisRequest::new("   ", "session-1", vec![ModalityKind::Inquiry]);
        assert!(matches!(req.validate_request(), Err(DiagnosisError::Validation(_))));
    }

    #[test]
    fn test_empty_modalities_rejected() {
        let req = DiagnosisRequest::new("user-1", "session-1", vec![]);
        assert!(matches!(req.validate_request(), Err(DiagnosisError::Validation(_))));
    }

    #[test]
    fn test_duplicate_modality_rejected() {
        let req = DiagnosisRequest::new(
            "user-1",
            "session-1",
            vec![ModalityKind::Inquiry, ModalityKind::Inquiry],
        );
        let err = req.validate_request().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        let not_object = request().with_input(ModalityKind::Inquiry, json!("text"));
        assert!(not_object.validate_request().is_err());

        let missing_image = request().with_input(ModalityKind::Looking, json!({"note": 1}));
        assert!(missing_image.validate_request().is_err());

        let unrequested = request().with_input(ModalityKind::Palpation, json!({"pulse_data": []}));
        assert!(unrequested.validate_request().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let req = request().with_timeout(Duration::ZERO);
        assert!(req.validate_request().is_err());
    }

    #[test]
    fn test_effective_timeout() {
        let default = Duration::from_secs(30);
        assert_eq!(request().effective_timeout(default), default);
        let req = request().with_timeout(Duration::from_millis(250));
        assert_eq!(req.effective_timeout(default), Duration::from_millis(250));
    }

    #[test]
    fn test_modality_parsing() {
        assert_eq!("look".parse::<ModalityKind>().unwrap(), ModalityKind::Looking);
        assert_eq!("Inquiry".parse::<ModalityKind>().unwrap(), ModalityKind::Inquiry);
        assert!("smell".parse::<ModalityKind>().is_err());
    }

    #[test]
    fn test_request_serializes_modality_keys() {
        let req = request().with_input(ModalityKind::Inquiry, json!({"text": "x"}));
        let value = serde_json::to_value(&req).unwrap();
        assert!(value["inputs"]["inquiry"].is_object());
        assert_eq!(value["modalities"][0], "inquiry");
    }
}
