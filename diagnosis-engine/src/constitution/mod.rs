//! Body-constitution classification.
//!
//! Scores the nine constitution types against the feature bag, picks a
//! dominant type and the tendency list, then attaches templated guidance.

pub mod profiles;

pub use profiles::{ConstitutionType, GuidanceTemplate, CONSTITUTION_SYMPTOMS};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConstitutionSettings;
use crate::features::FeatureBag;
use crate::rules::score_rules;
use crate::types::DiagnosisResult;
use profiles::{COMBINATION_NOTES, SPECIAL_DIATHESIS_NOTE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstitutionScore {
    pub constitution: ConstitutionType,
    pub raw_score: f64,
    /// 0-100
    pub normalized_score: f64,
    pub is_dominant: bool,
    pub confidence: f64,
    pub supporting_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthGuidance {
    pub constitution: ConstitutionType,
    pub diet: String,
    pub exercise: String,
    pub lifestyle: String,
    pub emotion: String,
    pub season: String,
    pub additional_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstitutionAnalysis {
    pub dominant: Option<ConstitutionScore>,
    /// All types, highest first
    pub scores: Vec<ConstitutionScore>,
    pub tendencies: Vec<ConstitutionType>,
    pub guidance: Option<HealthGuidance>,
    pub summary: String,
    pub overall_confidence: f64,
    pub analyzed_at: DateTime<Utc>,
}

impl ConstitutionAnalysis {
    /// An analysis with no findings and no guidance
    pub fn empty() -> Self {
        Self {
            dominant: None,
            scores: Vec::new(),
            tendencies: Vec::new(),
            guidance: None,
            summary: "No constitution analysis available".to_string(),
            overall_confidence: 0.0,
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn dominant_type(&self) -> Option<ConstitutionType> {
        self.dominant.as_ref().map(|d| d.constitution)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstitutionAnalyzer {
    settings: ConstitutionSettings,
}

impl ConstitutionAnalyzer {
    pub fn new(settings: ConstitutionSettings) -> Self {
        Self { settings }
    }

    pub fn analyze(&self, results: &[DiagnosisResult]) -> ConstitutionAnalysis {
        let bag = FeatureBag::extract(results, CONSTITUTION_SYMPTOMS);
        self.analyze_features(&bag)
    }

    pub fn analyze_features(&self, bag: &FeatureBag) -> ConstitutionAnalysis {
        let scores = self.score_constitutions(bag);
        let dominant = self.select_dominant(&scores);
        let tendencies = self.select_tendencies(&scores);
        let guidance = build_guidance(dominant.as_ref(), &tendencies);
        let summary = summarize(dominant.as_ref(), &tendencies);
        let overall_confidence = scores.first().map_or(0.0, |s| s.confidence);

        debug!(
            dominant = dominant.as_ref().map_or("none", |d| d.constitution.as_str()),
            tendencies = tendencies.len(),
            overall_confidence,
            "Constitution analysis complete"
        );

        ConstitutionAnalysis {
            dominant,
            scores,
            tendencies,
            guidance: Some(guidance),
            summary,
            overall_confidence,
            analyzed_at: Utc::now(),
        }
    }

    /// Score all nine types, highest first. Ties keep declaration order.
    pub fn score_constitutions(&self, bag: &FeatureBag) -> Vec<ConstitutionScore> {
        let mut scores: Vec<ConstitutionScore> = ConstitutionType::ALL
            .iter()
            .map(|constitution| {
                let outcome = score_rules(constitution.rules(), bag);
                ConstitutionScore {
                    constitution: *constitution,
                    raw_score: outcome.raw,
                    normalized_score: outcome.normalized,
                    is_dominant: outcome.normalized >= self.settings.dominant_threshold,
                    confidence: (outcome.normalized / 100.0).min(1.0),
                    supporting_features: outcome.matched.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();
        scores.sort_by(|a, b| b.normalized_score.total_cmp(&a.normalized_score));
        scores
    }

    /// First dominant score that clears the confidence floor
    pub fn select_dominant(&self, scores: &[ConstitutionScore]) -> Option<ConstitutionScore> {
        scores
            .iter()
            .find(|s| s.is_dominant && s.confidence >= self.settings.min_confidence)
            .cloned()
    }

    pub fn select_tendencies(&self, scores: &[ConstitutionScore]) -> Vec<ConstitutionType> {
        scores
            .iter()
            .filter(|s| {
                s.normalized_score >= self.settings.tendency_threshold
                    && s.confidence >= self.settings.min_confidence
            })
            .map(|s| s.constitution)
            .take(self.settings.max_tendencies)
            .collect()
    }
}

/// Guidance for the dominant type, else the top tendency, else balanced
fn build_guidance(
    dominant: Option<&ConstitutionScore>,
    tendencies: &[ConstitutionType],
) -> HealthGuidance {
    let constitution = dominant
        .map(|d| d.constitution)
        .or_else(|| tendencies.first().copied())
        .unwrap_or(ConstitutionType::Balanced);
    let template = constitution.guidance();

    HealthGuidance {
        constitution,
        diet: template.diet.to_string(),
        exercise: template.exercise.to_string(),
        lifestyle: template.lifestyle.to_string(),
        emotion: template.emotion.to_string(),
        season: template.season.to_string(),
        additional_notes: additional_notes(constitution, tendencies),
    }
}

fn additional_notes(main: ConstitutionType, tendencies: &[ConstitutionType]) -> Vec<String> {
    let mut notes = Vec::new();
    if tendencies.len() > 1 {
        notes.extend(
            COMBINATION_NOTES
                .iter()
                .filter(|c| tendencies.contains(&c.first) && tendencies.contains(&c.second))
                .map(|c| c.note.to_string()),
        );
    }
    if main == ConstitutionType::SpecialDiathesis {
        notes.push(SPECIAL_DIATHESIS_NOTE.to_string());
    }
    notes
}

fn summarize(dominant: Option<&ConstitutionScore>, tendencies: &[ConstitutionType]) -> String {
    match dominant {
        Some(dominant) => {
            let mut summary = format!(
                "Dominant constitution: {} (confidence {:.2})",
                dominant.constitution, dominant.confidence
            );
            let others = tendencies
                .iter()
                .filter(|t| **t != dominant.constitution)
                .map(ConstitutionType::name)
                .join(", ");
            if !others.is_empty() {
                summary.push_str(&format!("; also tending towards {others}"));
            }
            summary
        }
        None if !tendencies.is_empty() => format!(
            "Constitution tendencies: {}",
            tendencies.iter().map(ConstitutionType::name).join(", ")
        ),
        None => "Constitution features not distinctive; further observation recommended".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::features::paths;

    fn analyzer() -> ConstitutionAnalyzer {
        ConstitutionAnalyzer::new(ConstitutionSettings::default())
    }

    fn score(constitution: ConstitutionType, normalized: f64) -> ConstitutionScore {
        ConstitutionScore {
            constitution,
            raw_score: normalized / 100.0,
            normalized_score: normalized,
            is_dominant: normalized >= 60.0,
            confidence: (normalized / 100.0).min(1.0),
            supporting_features: Vec::new(),
        }
    }

    fn qi_deficient_bag() -> FeatureBag {
        // 容易疲乏 .9 + 容易出汗 .8 + 舌淡红 .7 + 脉弱 .8 + 声音低微 .6 = 3.8 of 5.2
        FeatureBag::new()
            .with_symptom("容易出汗")
            .with_text(paths::ENERGY, "低")
            .with_text(paths::TONGUE_COLOR, "淡红")
            .with_text(paths::PULSE_STRENGTH, "弱")
            .with_text(paths::VOICE_STRENGTH, "低微")
    }

    #[test]
    fn test_dominant_type_detected() {
        let analysis = analyzer().analyze_features(&qi_deficient_bag());
        let dominant = analysis.dominant.as_ref().unwrap();
        assert_eq!(dominant.constitution, ConstitutionType::QiDeficiency);
        assert!((dominant.normalized_score - 3.8 / 5.2 * 100.0).abs() < 1e-9);
        assert!(dominant.is_dominant);
        assert_eq!(analysis.overall_confidence, dominant.confidence);
        assert_eq!(
            analysis.guidance.as_ref().unwrap().constitution,
            ConstitutionType::QiDeficiency
        );
        assert!(analysis.summary.starts_with("Dominant constitution: Qi deficiency"));
    }

    #[test]
    fn test_scores_sorted_and_complete() {
        let scores = analyzer().score_constitutions(&qi_deficient_bag());
        assert_eq!(scores.len(), 9);
        assert!(scores
            .windows(2)
            .all(|w| w[0].normalized_score >= w[1].normalized_score));
    }

    #[test]
    fn test_tendency_thresholds() {
        let scores = vec![
            score(ConstitutionType::YangDeficiency, 55.0),
            score(ConstitutionType::QiDeficiency, 52.0),
            score(ConstitutionType::DampHeat, 45.0),
            score(ConstitutionType::BloodStasis, 39.9),
        ];
        let tendencies = analyzer().select_tendencies(&scores);
        // 45 clears the tendency threshold but its confidence is below the floor
        assert_eq!(
            tendencies,
            vec![ConstitutionType::YangDeficiency, ConstitutionType::QiDeficiency]
        );
        assert!(analyzer().select_dominant(&scores).is_none());
    }

    #[test]
    fn test_tendencies_capped_at_three() {
        let scores: Vec<_> = ConstitutionType::ALL.iter().map(|c| score(*c, 58.0)).collect();
        assert_eq!(analyzer().select_tendencies(&scores).len(), 3);
    }

    #[test]
    fn test_guidance_falls_back_to_tendency_then_balanced() {
        let guidance = build_guidance(None, &[ConstitutionType::DampHeat]);
        assert_eq!(guidance.constitution, ConstitutionType::DampHeat);

        let guidance = build_guidance(None, &[]);
        assert_eq!(guidance.constitution, ConstitutionType::Balanced);
        assert!(guidance.additional_notes.is_empty());
    }

    #[test]
    fn test_combination_notes() {
        let tendencies = [ConstitutionType::QiDeficiency, ConstitutionType::YangDeficiency];
        let notes = additional_notes(ConstitutionType::QiDeficiency, &tendencies);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].starts_with("Qi and yang"));

        // a single tendency never triggers a pair note
        let notes = additional_notes(ConstitutionType::QiDeficiency, &tendencies[..1]);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_special_diathesis_note() {
        let notes = additional_notes(ConstitutionType::SpecialDiathesis, &[]);
        assert_eq!(notes, vec![SPECIAL_DIATHESIS_NOTE.to_string()]);
    }

    #[test]
    fn test_summary_variants() {
        let dominant = score(ConstitutionType::YangDeficiency, 75.0);
        let summary = summarize(
            Some(&dominant),
            &[ConstitutionType::YangDeficiency, ConstitutionType::QiDeficiency],
        );
        assert_eq!(
            summary,
            "Dominant constitution: Yang deficiency (confidence 0.75); also tending towards Qi deficiency"
        );

        let summary = summarize(None, &[ConstitutionType::DampHeat]);
        assert_eq!(summary, "Constitution tendencies: Damp-heat");

        assert!(summarize(None, &[]).contains("not distinctive"));
    }

    #[test]
    fn test_complaint_heuristics_feed_scores() {
        let bag = FeatureBag::new()
            .with_symptom("情绪不稳定")
            .with_symptom("胸胁胀满")
            .with_symptom("善太息")
            .with_text(paths::MOOD, "不稳定")
            .with_text(paths::PULSE_STRENGTH, "弦")
            .with_text(paths::SLEEP_QUALITY, "不佳");
        let analysis = analyzer().analyze_features(&bag);
        assert_eq!(analysis.dominant_type(), Some(ConstitutionType::QiStagnation));
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let bag = qi_deficient_bag();
        assert_eq!(
            analyzer().score_constitutions(&bag),
            analyzer().score_constitutions(&bag)
        );
    }
}
