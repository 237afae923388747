//! Syndrome pattern analysis.
//!
//! Every pattern in the library is scored against the feature bag; patterns
//! above the primary threshold drive the pathogenesis summary, the treatment
//! principles and combination detection.

pub mod patterns;

pub use patterns::{
    find_pattern, SyndromeCategory, SyndromeCombination, SyndromePattern, SYMPTOM_VOCABULARY,
    SYNDROME_COMBINATIONS, SYNDROME_PATTERNS,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::config::SyndromeSettings;
use crate::features::FeatureBag;
use crate::rules::score_rules;
use crate::types::DiagnosisResult;

const PATHOGENESIS_UNCLEAR: &str = "Pathogenesis unclear";

/// One pattern's score for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyndromeScore {
    pub pattern_id: String,
    pub name: String,
    pub name_zh: String,
    pub category: SyndromeCategory,
    /// Normalized score, 0-100
    pub score: f64,
    /// `score / 100`
    pub confidence: f64,
    pub matched_features: Vec<String>,
    pub related_organs: Vec<String>,
    pub pathogenesis: String,
    pub treatment_principle: String,
}

impl SyndromeScore {
    fn from_pattern(pattern: &SyndromePattern, score: f64, matched: Vec<&str>) -> Self {
        Self {
            pattern_id: pattern.id.to_string(),
            name: pattern.name.to_string(),
            name_zh: pattern.name_zh.to_string(),
            category: pattern.category,
            score,
            confidence: score / 100.0,
            matched_features: matched.into_iter().map(str::to_string).collect(),
            related_organs: pattern.related_organs.iter().map(|o| (*o).to_string()).collect(),
            pathogenesis: pattern.pathogenesis.to_string(),
            treatment_principle: pattern.treatment_principle.to_string(),
        }
    }
}

/// A compound pattern found among the primary patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCombination {
    pub name: String,
    pub name_zh: String,
    pub patterns: Vec<String>,
    pub description: String,
    pub treatment_principle: String,
}

impl From<&SyndromeCombination> for DetectedCombination {
    fn from(combination: &SyndromeCombination) -> Self {
        Self {
            name: combination.name.to_string(),
            name_zh: combination.name_zh.to_string(),
            patterns: vec![combination.first.to_string(), combination.second.to_string()],
            description: combination.description.to_string(),
            treatment_principle: combination.treatment_principle.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyndromeAnalysis {
    pub primary_patterns: Vec<SyndromeScore>,
    pub secondary_patterns: Vec<SyndromeScore>,
    pub combinations: Vec<DetectedCombination>,
    pub pathogenesis_summary: String,
    pub treatment_principles: Vec<String>,
    pub overall_confidence: f64,
    pub analyzed_at: DateTime<Utc>,
}

impl SyndromeAnalysis {
    /// An analysis with no findings
    pub fn empty() -> Self {
        Self {
            primary_patterns: Vec::new(),
            secondary_patterns: Vec::new(),
            combinations: Vec::new(),
            pathogenesis_summary: PATHOGENESIS_UNCLEAR.to_string(),
            treatment_principles: Vec::new(),
            overall_confidence: 0.0,
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary_patterns.is_empty() && self.secondary_patterns.is_empty()
    }

    pub fn top_pattern(&self) -> Option<&SyndromeScore> {
        self.primary_patterns.first()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyndromeAnalyzer {
    settings: SyndromeSettings,
}

impl SyndromeAnalyzer {
    pub fn new(settings: SyndromeSettings) -> Self {
        Self { settings }
    }

    pub fn analyze(&self, results: &[DiagnosisResult]) -> SyndromeAnalysis {
        let bag = FeatureBag::extract(results, SYMPTOM_VOCABULARY);
        self.analyze_features(&bag)
    }

    pub fn analyze_features(&self, bag: &FeatureBag) -> SyndromeAnalysis {
        let scores = self.score_patterns(bag);
        let (primary, secondary) = self.classify(scores);

        let combinations = detect_combinations(&primary);
        let pathogenesis_summary = summarize_pathogenesis(&primary, &combinations);
        let treatment_principles = self.collect_treatment_principles(&primary);
        let overall_confidence = mean_confidence(&primary);

        debug!(
            symptoms = bag.symptoms().len(),
            primary = primary.len(),
            secondary = secondary.len(),
            combinations = combinations.len(),
            overall_confidence,
            "Syndrome analysis complete"
        );

        SyndromeAnalysis {
            primary_patterns: primary,
            secondary_patterns: secondary,
            combinations,
            pathogenesis_summary,
            treatment_principles,
            overall_confidence,
            analyzed_at: Utc::now(),
        }
    }

    /// Score every pattern, highest first. Ties keep library order.
    pub fn score_patterns(&self, bag: &FeatureBag) -> Vec<SyndromeScore> {
        let mut scores: Vec<SyndromeScore> = SYNDROME_PATTERNS
            .iter()
            .map(|pattern| {
                let outcome = score_rules(pattern.rules, bag);
                SyndromeScore::from_pattern(pattern, outcome.normalized, outcome.matched)
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores
    }

    /// Split scores into capped primary and secondary lists
    pub fn classify(&self, mut scores: Vec<SyndromeScore>) -> (Vec<SyndromeScore>, Vec<SyndromeScore>) {
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        for score in scores {
            if score.score >= self.settings.primary_threshold {
                if primary.len() < self.settings.max_primary {
                    primary.push(score);
                }
            } else if score.score >= self.settings.secondary_threshold
                && secondary.len() < self.settings.max_secondary
            {
                secondary.push(score);
            }
        }
        (primary, secondary)
    }

    fn collect_treatment_principles(&self, primary: &[SyndromeScore]) -> Vec<String> {
        let mut seen = HashSet::new();
        primary
            .iter()
            .map(|s| s.treatment_principle.clone())
            .filter(|t| seen.insert(t.clone()))
            .take(self.settings.max_treatment_principles)
            .collect()
    }
}

fn detect_combinations(primary: &[SyndromeScore]) -> Vec<DetectedCombination> {
    let ids: HashSet<&str> = primary.iter().map(|s| s.pattern_id.as_str()).collect();
    SYNDROME_COMBINATIONS
        .iter()
        .filter(|c| ids.contains(c.first) && ids.contains(c.second))
        .map(DetectedCombination::from)
        .collect()
}

fn summarize_pathogenesis(primary: &[SyndromeScore], combinations: &[DetectedCombination]) -> String {
    if let Some(combination) = combinations.first() {
        format!("{}: {}", combination.name, combination.description)
    } else if let Some(top) = primary.first() {
        format!("{}: {}", top.name, top.pathogenesis)
    } else {
        PATHOGENESIS_UNCLEAR.to_string()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_confidence(scores: &[SyndromeScore]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| s.confidence).sum::<f64>() / scores.len() as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::features::paths;

    fn analyzer() -> SyndromeAnalyzer {
        SyndromeAnalyzer::new(SyndromeSettings::default())
    }

    fn score(id: &str, value: f64) -> SyndromeScore {
        let pattern = find_pattern(id).unwrap();
        SyndromeScore::from_pattern(pattern, value, Vec::new())
    }

    fn yang_deficient_bag() -> FeatureBag {
        FeatureBag::new()
            .with_symptom("畏寒")
            .with_symptom("四肢不温")
            .with_symptom("精神萎靡")
            .with_text(paths::TONGUE_COLOR, "淡白")
            .with_text(paths::PULSE_DEPTH, "沉")
            .with_text(paths::PULSE_RATE, "迟")
    }

    #[test]
    fn test_full_match_is_primary() {
        let analysis = analyzer().analyze_features(&yang_deficient_bag());
        let top = analysis.top_pattern().unwrap();
        assert_eq!(top.pattern_id, "yang_deficiency");
        assert!((top.score - 100.0).abs() < 1e-9);
        assert_eq!(top.matched_features.len(), 5);
        assert_eq!(analysis.pathogenesis_summary, "Yang deficiency: Declining yang qi fails to warm the body");
    }

    #[test]
    fn test_shared_keywords_feed_related_patterns() {
        // 舌淡 + 脉沉迟 give kidney yang deficiency 2 of 5 keywords
        let analysis = analyzer().analyze_features(&yang_deficient_bag());
        let kidney = analysis
            .secondary_patterns
            .iter()
            .find(|s| s.pattern_id == "kidney_yang_deficiency")
            .unwrap();
        assert!((kidney.score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_boundaries() {
        let (primary, secondary) = analyzer().classify(vec![
            score("qi_deficiency", 69.999),
            score("yang_deficiency", 70.0),
            score("blood_stasis", 40.0),
            score("yin_deficiency", 39.999),
        ]);
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].pattern_id, "yang_deficiency");
        let secondary_ids: Vec<_> = secondary.iter().map(|s| s.pattern_id.as_str()).collect();
        assert_eq!(secondary_ids, vec!["qi_deficiency", "blood_stasis"]);
    }

    #[test]
    fn test_caps_applied() {
        let scores = SYNDROME_PATTERNS
            .iter()
            .map(|p| SyndromeScore::from_pattern(p, 80.0, Vec::new()))
            .collect();
        let (primary, secondary) = analyzer().classify(scores);
        assert_eq!(primary.len(), 3);
        assert!(secondary.is_empty());

        let scores = SYNDROME_PATTERNS
            .iter()
            .map(|p| SyndromeScore::from_pattern(p, 50.0, Vec::new()))
            .collect();
        let (primary, secondary) = analyzer().classify(scores);
        assert!(primary.is_empty());
        assert_eq!(secondary.len(), 5);
    }

    #[test]
    fn test_combination_detected_from_primary() {
        let bag = FeatureBag::new()
            .with_symptom("神疲乏力")
            .with_symptom("气短懒言")
            .with_symptom("自汗")
            .with_symptom("刺痛")
            .with_symptom("痛有定处")
            .with_text(paths::TONGUE_COLOR, "紫暗")
            .with_text(paths::PULSE_STRENGTH, "弱");
        let analysis = analyzer().analyze_features(&bag);

        let ids: Vec<_> = analysis.primary_patterns.iter().map(|s| s.pattern_id.as_str()).collect();
        assert!(ids.contains(&"qi_deficiency"));
        assert!(ids.contains(&"blood_stasis"));
        assert_eq!(analysis.combinations.len(), 1);
        assert_eq!(analysis.combinations[0].name_zh, "气虚血瘀");
        assert!(analysis.pathogenesis_summary.starts_with("Qi deficiency with blood stasis"));
    }

    #[test]
    fn test_overall_confidence_is_mean_of_primary() {
        let bag = FeatureBag::new()
            .with_symptom("神疲乏力")
            .with_symptom("气短懒言")
            .with_symptom("自汗")
            .with_text(paths::PULSE_STRENGTH, "弱")
            .with_symptom("刺痛")
            .with_symptom("痛有定处")
            .with_symptom("舌紫暗");
        let analysis = analyzer().analyze_features(&bag);
        // qi deficiency 4/5 = 80, blood stasis 3/4 = 75
        assert!((analysis.overall_confidence - 0.775).abs() < 1e-9);
        assert_eq!(
            analysis.treatment_principles,
            vec!["Tonify qi and strengthen the spleen", "Activate blood and resolve stasis"]
        );
    }

    #[test]
    fn test_no_evidence_yields_unclear_summary() {
        let analysis = analyzer().analyze_features(&FeatureBag::new());
        assert!(analysis.primary_patterns.is_empty());
        assert!(analysis.secondary_patterns.is_empty());
        assert_eq!(analysis.overall_confidence, 0.0);
        assert_eq!(analysis.pathogenesis_summary, PATHOGENESIS_UNCLEAR);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let bag = yang_deficient_bag();
        let first = analyzer().score_patterns(&bag);
        let second = analyzer().score_patterns(&bag);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
