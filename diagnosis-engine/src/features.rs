//! Flattening of modality feature groups into one bag of named values.
//!
//! Modality services report nested groups such as `tongue_analysis` or
//! `pulse_analysis`. Analyzers match rules against flat paths instead, so the
//! same rule table works no matter which service produced a value.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::types::{DiagnosisResult, ModalityKind};

/// Flat feature paths
pub mod paths {
    pub const TONGUE_COLOR: &str = "tongue.color";
    pub const TONGUE_COATING: &str = "tongue.coating";
    pub const TONGUE_SHAPE: &str = "tongue.shape";
    pub const TONGUE_MOISTURE: &str = "tongue.moisture";

    pub const FACE_COLOR: &str = "face.color";
    pub const FACE_COMPLEXION: &str = "face.complexion";
    pub const FACE_LUSTER: &str = "face.luster";

    pub const BODY_TYPE: &str = "body.type";
    pub const BODY_POSTURE: &str = "body.posture";
    pub const BODY_BMI: &str = "body.bmi";

    pub const VOICE_STRENGTH: &str = "voice.strength";
    pub const VOICE_QUALITY: &str = "voice.quality";
    pub const VOICE_RHYTHM: &str = "voice.rhythm";

    pub const BREATHING_RATE: &str = "breathing.rate";
    pub const BREATHING_DEPTH: &str = "breathing.depth";
    pub const BREATHING_SOUND: &str = "breathing.sound";

    pub const PAIN: &str = "inquiry.pain";
    pub const SLEEP_QUALITY: &str = "sleep.quality";
    pub const SLEEP_DURATION: &str = "sleep.duration";
    pub const SLEEP_DREAMS: &str = "sleep.dreams";
    pub const APPETITE: &str = "diet.appetite";
    pub const FOOD_PREFERENCES: &str = "diet.preferences";
    pub const THIRST: &str = "diet.thirst";

    pub const ENERGY: &str = "mental.energy";
    pub const MOOD: &str = "mental.mood";
    pub const STRESS: &str = "mental.stress";

    pub const PULSE_RATE: &str = "pulse.rate";
    pub const PULSE_STRENGTH: &str = "pulse.strength";
    pub const PULSE_RHYTHM: &str = "pulse.rhythm";
    pub const PULSE_DEPTH: &str = "pulse.depth";
}

/// A single extracted value
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Text(String),
    Number(f64),
}

impl FeatureValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(FeatureValue::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(FeatureValue::Number),
            _ => None,
        }
    }
}

struct FieldMapping {
    modality: ModalityKind,
    group: &'static str,
    field: &'static str,
    path: &'static str,
}

macro_rules! mapping {
    ($modality:ident, $group:literal, $field:literal => $path:expr) => {
        FieldMapping {
            modality: ModalityKind::$modality,
            group: $group,
            field: $field,
            path: $path,
        }
    };
}

static FIELD_MAPPINGS: &[FieldMapping] = &[
    mapping!(Looking, "tongue_analysis", "tongue_color" => paths::TONGUE_COLOR),
    mapping!(Looking, "tongue_analysis", "coating_color" => paths::TONGUE_COATING),
    mapping!(Looking, "tongue_analysis", "tongue_shape" => paths::TONGUE_SHAPE),
    mapping!(Looking, "tongue_analysis", "moisture" => paths::TONGUE_MOISTURE),
    mapping!(Looking, "face_analysis", "overall_color" => paths::FACE_COLOR),
    mapping!(Looking, "face_analysis", "complexion" => paths::FACE_COMPLEXION),
    mapping!(Looking, "face_analysis", "luster" => paths::FACE_LUSTER),
    mapping!(Looking, "body_analysis", "body_type" => paths::BODY_TYPE),
    mapping!(Looking, "body_analysis", "posture" => paths::BODY_POSTURE),
    mapping!(Looking, "body_analysis", "bmi" => paths::BODY_BMI),
    mapping!(Listening, "voice_analysis", "voice_strength" => paths::VOICE_STRENGTH),
    mapping!(Listening, "voice_analysis", "voice_quality" => paths::VOICE_QUALITY),
    mapping!(Listening, "voice_analysis", "speech_rhythm" => paths::VOICE_RHYTHM),
    mapping!(Listening, "breathing_analysis", "breathing_rate" => paths::BREATHING_RATE),
    mapping!(Listening, "breathing_analysis", "breathing_depth" => paths::BREATHING_DEPTH),
    mapping!(Listening, "breathing_analysis", "breathing_sound" => paths::BREATHING_SOUND),
    mapping!(Inquiry, "conversation_analysis", "pain_description" => paths::PAIN),
    mapping!(Inquiry, "conversation_analysis", "sleep_quality" => paths::SLEEP_QUALITY),
    mapping!(Inquiry, "conversation_analysis", "sleep_duration" => paths::SLEEP_DURATION),
    mapping!(Inquiry, "conversation_analysis", "dream_frequency" => paths::SLEEP_DREAMS),
    mapping!(Inquiry, "conversation_analysis", "appetite" => paths::APPETITE),
    mapping!(Inquiry, "conversation_analysis", "food_preferences" => paths::FOOD_PREFERENCES),
    mapping!(Inquiry, "conversation_analysis", "thirst" => paths::THIRST),
    mapping!(Palpation, "pulse_analysis", "pulse_overall_type" => paths::PULSE_RATE),
    mapping!(Palpation, "pulse_analysis", "pulse_force" => paths::PULSE_STRENGTH),
    mapping!(Palpation, "pulse_analysis", "pulse_rhythm" => paths::PULSE_RHYTHM),
    mapping!(Palpation, "pulse_analysis", "pulse_depth" => paths::PULSE_DEPTH),
];

const CONVERSATION_GROUP: &str = "conversation_analysis";
const CHIEF_COMPLAINT: &str = "chief_complaint";
const REPORTED_SYMPTOMS: &str = "symptoms";

const LOW_ENERGY_MARKERS: &[&str] = &["疲乏", "乏力", "困倦", "精神不振"];
const HIGH_ENERGY_MARKERS: &[&str] = &["精力充沛", "精神饱满"];
const UNSTABLE_MOOD_MARKERS: &[&str] = &["抑郁", "烦躁", "易怒", "焦虑"];
const STABLE_MOOD_MARKERS: &[&str] = &["开朗", "乐观"];
const HIGH_STRESS_MARKERS: &[&str] = &["压力大", "紧张", "焦虑", "失眠"];

/// Named values plus the symptom list of one analysis run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureBag {
    symptoms: Vec<String>,
    fields: BTreeMap<&'static str, FeatureValue>,
}

impl FeatureBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten completed results. Complaint text is scanned for the given
    /// symptom vocabulary; later results overwrite earlier values.
    pub fn extract(results: &[DiagnosisResult], vocabulary: &[&str]) -> Self {
        let mut bag = Self::new();

        for result in results.iter().filter(|r| r.is_completed()) {
            for mapping in FIELD_MAPPINGS.iter().filter(|m| m.modality == result.modality) {
                let value = result
                    .feature_group(mapping.group)
                    .and_then(|group| group.get(mapping.field))
                    .and_then(FeatureValue::from_json);
                if let Some(value) = value {
                    bag.fields.insert(mapping.path, value);
                }
            }

            if result.modality == ModalityKind::Inquiry {
                if let Some(conversation) = result.feature_group(CONVERSATION_GROUP) {
                    bag.absorb_conversation(conversation, vocabulary);
                }
            }
        }

        bag
    }

    fn absorb_conversation(&mut self, conversation: &Map<String, Value>, vocabulary: &[&str]) {
        let complaint = conversation
            .get(CHIEF_COMPLAINT)
            .and_then(Value::as_str)
            .unwrap_or_default();

        for keyword in vocabulary.iter().filter(|k| complaint.contains(**k)) {
            self.add_symptom(keyword);
        }
        if let Some(reported) = conversation.get(REPORTED_SYMPTOMS).and_then(Value::as_array) {
            for symptom in reported.iter().filter_map(Value::as_str) {
                self.add_symptom(symptom);
            }
        }

        let energy = if contains_any(complaint, LOW_ENERGY_MARKERS) {
            "低"
        } else if contains_any(complaint, HIGH_ENERGY_MARKERS) {
            "高"
        } else {
            "中等"
        };
        let mood = if contains_any(complaint, UNSTABLE_MOOD_MARKERS) {
            "不稳定"
        } else if contains_any(complaint, STABLE_MOOD_MARKERS) {
            "稳定"
        } else {
            "一般"
        };
        let stress = if contains_any(complaint, HIGH_STRESS_MARKERS) {
            "高"
        } else {
            "正常"
        };

        self.set_text(paths::ENERGY, energy);
        self.set_text(paths::MOOD, mood);
        self.set_text(paths::STRESS, stress);
    }

    pub fn add_symptom(&mut self, symptom: &str) {
        if !self.has_symptom(symptom) {
            self.symptoms.push(symptom.to_string());
        }
    }

    pub fn set_text(&mut self, path: &'static str, value: &str) {
        self.fields.insert(path, FeatureValue::Text(value.to_string()));
    }

    pub fn set_number(&mut self, path: &'static str, value: f64) {
        self.fields.insert(path, FeatureValue::Number(value));
    }

    pub fn with_symptom(mut self, symptom: &str) -> Self {
        self.add_symptom(symptom);
        self
    }

    pub fn with_text(mut self, path: &'static str, value: &str) -> Self {
        self.set_text(path, value);
        self
    }

    pub fn with_number(mut self, path: &'static str, value: f64) -> Self {
        self.set_number(path, value);
        self
    }

    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    pub fn has_symptom(&self, symptom: &str) -> bool {
        self.symptoms.iter().any(|s| s == symptom)
    }

    pub fn get(&self, path: &str) -> Option<&FeatureValue> {
        self.fields.get(path)
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        match self.fields.get(path) {
            Some(FeatureValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric value, parsing text when the service sent a string
    pub fn number(&self, path: &str) -> Option<f64> {
        match self.fields.get(path) {
            Some(FeatureValue::Number(n)) => Some(*n),
            Some(FeatureValue::Text(s)) => s.trim().parse().ok(),
            None => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.fields.is_empty()
    }
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modality::ModalityResponse;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn completed(modality: ModalityKind, features: Value) -> DiagnosisResult {
        let features = features.as_object().cloned().unwrap_or_default();
        DiagnosisResult::completed(
            Uuid::new_v4(),
            modality,
            ModalityResponse::new(0.8, features),
            Utc::now(),
            5,
        )
    }

    #[test]
    fn test_extracts_tongue_and_pulse() {
        let results = vec![
            completed(
                ModalityKind::Looking,
                json!({"tongue_analysis": {"tongue_color": "淡白", "coating_color": "薄白"},
                       "body_analysis": {"bmi": 27.5}}),
            ),
            completed(
                ModalityKind::Palpation,
                json!({"pulse_analysis": {"pulse_depth": "沉", "pulse_overall_type": "迟"}}),
            ),
        ];
        let bag = FeatureBag::extract(&results, &[]);
        assert_eq!(bag.text(paths::TONGUE_COLOR), Some("淡白"));
        assert_eq!(bag.text(paths::TONGUE_COATING), Some("薄白"));
        assert_eq!(bag.text(paths::PULSE_DEPTH), Some("沉"));
        assert_eq!(bag.text(paths::PULSE_RATE), Some("迟"));
        assert_eq!(bag.number(paths::BODY_BMI), Some(27.5));
    }

    #[test]
    fn test_groups_only_read_from_their_modality() {
        let results = vec![completed(
            ModalityKind::Inquiry,
            json!({"tongue_analysis": {"tongue_color": "红"}}),
        )];
        let bag = FeatureBag::extract(&results, &[]);
        assert!(bag.text(paths::TONGUE_COLOR).is_none());
    }

    #[test]
    fn test_complaint_scanned_for_vocabulary_and_mental_state() {
        let results = vec![completed(
            ModalityKind::Inquiry,
            json!({"conversation_analysis": {
                "chief_complaint": "最近畏寒，精神萎靡，常感疲乏，工作压力大",
                "sleep_quality": "不佳"
            }}),
        )];
        let bag = FeatureBag::extract(&results, &["畏寒", "精神萎靡", "盗汗"]);
        assert_eq!(bag.symptoms(), &["畏寒".to_string(), "精神萎靡".to_string()]);
        assert_eq!(bag.text(paths::ENERGY), Some("低"));
        assert_eq!(bag.text(paths::MOOD), Some("一般"));
        assert_eq!(bag.text(paths::STRESS), Some("高"));
        assert_eq!(bag.text(paths::SLEEP_QUALITY), Some("不佳"));
    }

    #[test]
    fn test_failed_results_ignored() {
        let failed = DiagnosisResult::failed(
            Uuid::new_v4(),
            ModalityKind::Looking,
            "boom",
            Utc::now(),
            1,
        );
        assert!(FeatureBag::extract(&[failed], &["畏寒"]).is_empty());
    }

    #[test]
    fn test_non_scalar_values_skipped() {
        let results = vec![completed(
            ModalityKind::Looking,
            json!({"tongue_analysis": {"tongue_color": ["红"], "moisture": ""}}),
        )];
        let bag = FeatureBag::extract(&results, &[]);
        assert!(bag.get(paths::TONGUE_COLOR).is_none());
        assert!(bag.get(paths::TONGUE_MOISTURE).is_none());
    }
}
