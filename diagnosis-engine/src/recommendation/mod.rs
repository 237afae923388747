//! Personalised health recommendations.
//!
//! Recommendations are drawn from static templates triggered by the primary
//! syndromes, the dominant constitution, individual modality findings, the
//! calendar season and the user's age. The combined list is then screened
//! against the user's medical conditions, cleared of contradictory diet
//! advice, ranked and capped.

pub mod contraindications;
pub mod plan;
pub mod templates;

pub use contraindications::{contraindications_for, Contraindication};
pub use plan::{FollowUpCheckpoint, RecommendationPlan};
pub use templates::{RecommendationTemplate, Season};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RecommendationSettings;
use crate::constitution::{ConstitutionAnalysis, ConstitutionType};
use crate::syndrome::{SyndromeAnalysis, SyndromeScore};
use crate::types::{DiagnosisResult, MedicalCondition, UserProfile};

use templates as t;

const SEASONAL_CONFIDENCE: f64 = 0.8;
const PREVENTION_CONFIDENCE: f64 = 0.7;
const AGE_BAND_CONFIDENCE: f64 = 0.8;
const ELDERLY_AGE: u32 = 65;
const MIDDLE_AGE: u32 = 40;

const SLEEP_QUALITY_KEY: &str = "sleep_quality";
const STRESS_LEVEL_KEY: &str = "stress_level";
const SYMPTOMS_KEY: &str = "symptoms";
const POOR_SLEEP: &[&str] = &["不佳", "poor"];
const HIGH_STRESS: &[&str] = &["高", "high"];

const WARM_DESCRIPTORS: &[&str] = &["warm", "warming", "hot"];
const COOL_DESCRIPTORS: &[&str] = &["cool", "cooling", "cold"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Diet,
    Exercise,
    Lifestyle,
    Medication,
    Acupuncture,
    Massage,
    Emotional,
    Seasonal,
    Prevention,
    Monitoring,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::Diet => "diet",
            RecommendationType::Exercise => "exercise",
            RecommendationType::Lifestyle => "lifestyle",
            RecommendationType::Medication => "medication",
            RecommendationType::Acupuncture => "acupuncture",
            RecommendationType::Massage => "massage",
            RecommendationType::Emotional => "emotional",
            RecommendationType::Seasonal => "seasonal",
            RecommendationType::Prevention => "prevention",
            RecommendationType::Monitoring => "monitoring",
        }
    }
}

/// Five ranked levels, `Urgent` highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Info = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Urgent = 5,
}

impl Priority {
    pub fn level(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub category: RecommendationType,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// Notes of the contraindications this recommendation triggered
    pub contraindications: Vec<String>,
    pub precautions: Vec<String>,
    pub duration: Option<String>,
    pub frequency: Option<String>,
    pub dosage: Option<String>,
    pub related_syndromes: Vec<String>,
    pub related_constitutions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    pub fn from_template(
        template: &RecommendationTemplate,
        confidence: f64,
        created_at: DateTime<Utc>,
        validity_days: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: template.category,
            title: template.title.to_string(),
            description: template.render_description(),
            priority: template.priority,
            confidence,
            evidence: Vec::new(),
            contraindications: Vec::new(),
            precautions: template.precautions.iter().map(|p| (*p).to_string()).collect(),
            duration: template.duration.map(str::to_string),
            frequency: template.frequency.map(str::to_string),
            dosage: None,
            related_syndromes: Vec::new(),
            related_constitutions: Vec::new(),
            created_at,
            expires_at: created_at.checked_add_signed(Duration::days(i64::from(validity_days))),
        }
    }

    fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    fn with_syndrome(mut self, syndrome: &str) -> Self {
        self.related_syndromes.push(syndrome.to_string());
        self
    }

    fn with_constitution(mut self, constitution: ConstitutionType) -> Self {
        self.related_constitutions.push(constitution.name().to_string());
        self
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| at >= expiry)
    }
}

/// Output of one generation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRecommendations {
    /// Ranked, deduplicated and capped
    pub recommendations: Vec<Recommendation>,
    /// Removed for the user's medical conditions, each with its matched notes
    pub filtered: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    settings: RecommendationSettings,
}

impl RecommendationEngine {
    pub fn new(settings: RecommendationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    pub fn generate(
        &self,
        syndrome: &SyndromeAnalysis,
        constitution: &ConstitutionAnalysis,
        results: &[DiagnosisResult],
        profile: Option<&UserProfile>,
    ) -> GeneratedRecommendations {
        self.generate_at(Utc::now(), syndrome, constitution, results, profile)
    }

    /// Same as [`generate`](Self::generate) with an explicit clock; the month
    /// of `now` selects the seasonal template.
    pub fn generate_at(
        &self,
        now: DateTime<Utc>,
        syndrome: &SyndromeAnalysis,
        constitution: &ConstitutionAnalysis,
        results: &[DiagnosisResult],
        profile: Option<&UserProfile>,
    ) -> GeneratedRecommendations {
        let mut candidates = self.from_syndromes(now, syndrome);
        candidates.extend(self.from_constitution(now, constitution));
        candidates.extend(self.from_results(now, results));
        candidates.push(self.seasonal(now));
        candidates.extend(self.prevention(now, profile));
        let generated = candidates.len();

        let conditions = profile.map_or(&[][..], |p| p.medical_conditions.as_slice());
        let (kept, filtered) = filter_contraindications(candidates, conditions);
        let recommendations = self.prioritize(resolve_conflicts(kept));

        info!(
            generated,
            filtered = filtered.len(),
            returned = recommendations.len(),
            "Recommendations generated"
        );

        GeneratedRecommendations {
            recommendations,
            filtered,
        }
    }

    pub fn create_recommendation_plan(
        &self,
        user_id: &str,
        session_id: &str,
        recommendations: Vec<Recommendation>,
    ) -> RecommendationPlan {
        self.create_recommendation_plan_at(Utc::now(), user_id, session_id, recommendations)
    }

    pub fn create_recommendation_plan_at(
        &self,
        now: DateTime<Utc>,
        user_id: &str,
        session_id: &str,
        recommendations: Vec<Recommendation>,
    ) -> RecommendationPlan {
        plan::build_plan(
            user_id,
            session_id,
            recommendations,
            now,
            self.settings.plan_validity_days,
        )
    }

    /// Sort by priority then confidence, drop repeated (type, title) pairs, cap
    pub fn prioritize(&self, mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        recommendations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });

        let mut seen = HashSet::new();
        recommendations
            .into_iter()
            .filter(|r| seen.insert((r.category, r.title.clone())))
            .take(self.settings.max_per_session)
            .collect()
    }

    fn render(&self, template: &RecommendationTemplate, confidence: f64, now: DateTime<Utc>) -> Recommendation {
        Recommendation::from_template(template, confidence, now, self.settings.validity_days)
    }

    fn from_syndromes(&self, now: DateTime<Utc>, analysis: &SyndromeAnalysis) -> Vec<Recommendation> {
        analysis
            .primary_patterns
            .iter()
            .flat_map(|pattern| {
                syndrome_templates(pattern).iter().map(move |template| {
                    self.render(template, pattern.confidence, now)
                        .with_syndrome(&pattern.name)
                        .with_evidence(format!(
                            "Primary syndrome: {} (score {:.1})",
                            pattern.name, pattern.score
                        ))
                })
            })
            .collect()
    }

    /// Templates for the dominant type plus general lifestyle advice
    fn from_constitution(&self, now: DateTime<Utc>, analysis: &ConstitutionAnalysis) -> Vec<Recommendation> {
        let Some(dominant) = &analysis.dominant else {
            return Vec::new();
        };
        let constitution = dominant.constitution;
        let evidence = format!("Dominant constitution: {}", constitution.name());

        constitution_templates(constitution)
            .iter()
            .copied()
            .chain(std::iter::once(&t::LIFESTYLE_GENERAL))
            .map(|template| {
                self.render(template, dominant.confidence, now)
                    .with_constitution(constitution)
                    .with_evidence(evidence.clone())
            })
            .collect()
    }

    fn from_results(&self, now: DateTime<Utc>, results: &[DiagnosisResult]) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        for result in results
            .iter()
            .filter(|r| r.is_completed() && r.confidence >= self.settings.min_result_confidence)
        {
            let modality = result.modality;

            if text_feature(&result.features, SLEEP_QUALITY_KEY).is_some_and(|v| POOR_SLEEP.contains(&v)) {
                recommendations.push(
                    self.render(&t::SLEEP_IMPROVEMENT, result.confidence, now)
                        .with_evidence(format!("{modality} reported poor sleep quality")),
                );
            }

            if text_feature(&result.features, STRESS_LEVEL_KEY).is_some_and(|v| HIGH_STRESS.contains(&v)) {
                recommendations.push(
                    self.render(&t::STRESS_MANAGEMENT, result.confidence, now)
                        .with_evidence(format!("{modality} reported a high stress level")),
                );
            }

            let symptoms = reported_symptoms(&result.features);
            if !symptoms.is_empty() {
                let mut monitoring = self
                    .render(&t::SYMPTOM_MONITORING, result.confidence, now)
                    .with_evidence(format!("{modality} reported {} symptom(s)", symptoms.len()));
                monitoring.description = format!("{}: {}", t::SYMPTOM_MONITORING.description, symptoms.join(", "));
                recommendations.push(monitoring);
            }
        }

        recommendations
    }

    fn seasonal(&self, now: DateTime<Utc>) -> Recommendation {
        let season = Season::from_month(now.month());
        self.render(season.template(), SEASONAL_CONFIDENCE, now)
            .with_evidence(format!("Current season: {}", season.as_str()))
    }

    fn prevention(&self, now: DateTime<Utc>, profile: Option<&UserProfile>) -> Vec<Recommendation> {
        let mut recommendations = vec![self.render(&t::PREVENTION_GENERAL, PREVENTION_CONFIDENCE, now)];

        let age_band = profile.and_then(|p| p.age).and_then(|age| {
            if age >= ELDERLY_AGE {
                Some((age, &t::ELDERLY_CARE))
            } else if age >= MIDDLE_AGE {
                Some((age, &t::MIDDLE_AGE_CARE))
            } else {
                None
            }
        });
        if let Some((age, template)) = age_band {
            recommendations.push(self.render(template, AGE_BAND_CONFIDENCE, now).with_evidence(format!("Age {age}")));
        }

        recommendations
    }
}

fn syndrome_templates(pattern: &SyndromeScore) -> &'static [&'static RecommendationTemplate] {
    let name = pattern.name_zh.as_str();
    if name.contains("阳虚") {
        &[&t::DIET_YANG_DEFICIENCY, &t::EXERCISE_YANG_DEFICIENCY]
    } else if name.contains("阴虚") {
        &[&t::DIET_YIN_DEFICIENCY]
    } else if name.contains("气虚") {
        &[&t::DIET_QI_DEFICIENCY, &t::EXERCISE_QI_DEFICIENCY]
    } else if name.contains("痰湿") {
        &[&t::DIET_PHLEGM_DAMPNESS, &t::EXERCISE_PHLEGM_DAMPNESS]
    } else if name.contains("气郁") || name.contains("肝郁") {
        &[&t::EMOTIONAL_QI_STAGNATION]
    } else {
        &[]
    }
}

fn constitution_templates(constitution: ConstitutionType) -> &'static [&'static RecommendationTemplate] {
    match constitution {
        ConstitutionType::YangDeficiency => &[&t::DIET_YANG_DEFICIENCY, &t::EXERCISE_YANG_DEFICIENCY],
        ConstitutionType::YinDeficiency => &[&t::DIET_YIN_DEFICIENCY],
        ConstitutionType::QiDeficiency => &[&t::DIET_QI_DEFICIENCY, &t::EXERCISE_QI_DEFICIENCY],
        ConstitutionType::PhlegmDampness => &[&t::DIET_PHLEGM_DAMPNESS, &t::EXERCISE_PHLEGM_DAMPNESS],
        ConstitutionType::QiStagnation => &[&t::EMOTIONAL_QI_STAGNATION],
        ConstitutionType::Balanced
        | ConstitutionType::DampHeat
        | ConstitutionType::BloodStasis
        | ConstitutionType::SpecialDiathesis => &[],
    }
}

/// A feature at the top level of the result, or inside one of its groups
fn find_feature<'a>(features: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    features.get(key).or_else(|| {
        features
            .values()
            .filter_map(Value::as_object)
            .find_map(|group| group.get(key))
    })
}

fn text_feature<'a>(features: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    find_feature(features, key).and_then(Value::as_str)
}

fn reported_symptoms(features: &Map<String, Value>) -> Vec<&str> {
    find_feature(features, SYMPTOMS_KEY)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Split recommendations into those safe for the given conditions and those
/// that triggered a contraindication. Filtered ones carry the matched notes.
pub fn filter_contraindications(
    recommendations: Vec<Recommendation>,
    conditions: &[MedicalCondition],
) -> (Vec<Recommendation>, Vec<Recommendation>) {
    if conditions.is_empty() {
        return (recommendations, Vec::new());
    }

    let mut kept = Vec::new();
    let mut filtered = Vec::new();
    for mut recommendation in recommendations {
        let notes = contraindications::matching_notes(conditions, &recommendation.description);
        if notes.is_empty() {
            kept.push(recommendation);
        } else {
            debug!(
                title = %recommendation.title,
                contraindications = notes.len(),
                "Recommendation filtered by contraindication"
            );
            recommendation
                .contraindications
                .extend(notes.into_iter().map(str::to_string));
            filtered.push(recommendation);
        }
    }
    (kept, filtered)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThermalNature {
    Warm,
    Cool,
}

fn thermal_nature(description: &str) -> Option<ThermalNature> {
    let lower = description.to_lowercase();
    let words: HashSet<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let warm = WARM_DESCRIPTORS.iter().any(|d| words.contains(d));
    let cool = COOL_DESCRIPTORS.iter().any(|d| words.contains(d));
    match (warm, cool) {
        (true, false) => Some(ThermalNature::Warm),
        (false, true) => Some(ThermalNature::Cool),
        _ => None,
    }
}

fn diet_conflict(first: &Recommendation, second: &Recommendation) -> bool {
    if first.category != RecommendationType::Diet || second.category != RecommendationType::Diet {
        return false;
    }
    matches!(
        (thermal_nature(&first.description), thermal_nature(&second.description)),
        (Some(ThermalNature::Warm), Some(ThermalNature::Cool))
            | (Some(ThermalNature::Cool), Some(ThermalNature::Warm))
    )
}

/// Drop the less confident side of every warming/cooling diet pair. On a tie
/// the earlier recommendation goes.
pub fn resolve_conflicts(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut dropped = HashSet::new();
    for (i, first) in recommendations.iter().enumerate() {
        for (j, second) in recommendations.iter().enumerate().skip(i + 1) {
            if dropped.contains(&i) {
                break;
            }
            if dropped.contains(&j) || !diet_conflict(first, second) {
                continue;
            }
            if first.confidence > second.confidence {
                dropped.insert(j);
            } else {
                dropped.insert(i);
            }
        }
    }

    if !dropped.is_empty() {
        debug!(dropped = dropped.len(), "Conflicting diet recommendations removed");
    }

    recommendations
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, r)| r)
        .collect()
}
