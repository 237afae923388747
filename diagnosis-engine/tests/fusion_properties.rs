//! Property tests for fusion invariants

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use async_trait::async_trait;
use chrono::Utc;
use diagnosis_engine::constitution::CONSTITUTION_SYMPTOMS;
use diagnosis_engine::syndrome::SYMPTOM_VOCABULARY;
use diagnosis_engine::*;
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

struct FlakyClient {
    modality: ModalityKind,
    fails: bool,
}

#[async_trait]
impl ModalityClient for FlakyClient {
    fn modality(&self) -> ModalityKind {
        self.modality
    }

    async fn analyze(&self, _user_id: &str, _session_id: &str, _data: &Value) -> ModalityResult<ModalityResponse> {
        if self.fails {
            Err(ModalityError::Transport("reset by peer".to_string()))
        } else {
            Ok(ModalityResponse::new(0.7, Map::new()))
        }
    }
}

fn completed(modality: ModalityKind, confidence: f64) -> DiagnosisResult {
    DiagnosisResult::completed(
        Uuid::new_v4(),
        modality,
        ModalityResponse::new(confidence, Map::new()),
        Utc::now(),
        1,
    )
}

fn modality_results() -> impl Strategy<Value = Vec<DiagnosisResult>> {
    prop::collection::vec((0usize..5, 0.0f64..=1.0), 1..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(index, confidence)| completed(ModalityKind::ALL[index], confidence))
            .collect()
    })
}

proptest! {
    #[test]
    fn weighted_confidence_ignores_result_order(results in modality_results()) {
        let weights = ModalityWeights::default();
        let forward = weighted_confidence(&weights, &results);

        let mut reversed = results.clone();
        reversed.reverse();
        let backward = weighted_confidence(&weights, &reversed);

        prop_assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn weighted_confidence_stays_within_inputs(results in modality_results()) {
        let confidence = weighted_confidence(&ModalityWeights::default(), &results);
        let min = results.iter().map(|r| r.confidence).fold(f64::INFINITY, f64::min);
        let max = results.iter().map(|r| r.confidence).fold(f64::NEG_INFINITY, f64::max);

        prop_assert!(confidence >= min - 1e-9);
        prop_assert!(confidence <= max + 1e-9);
    }

    #[test]
    fn analyzer_scoring_is_repeatable(
        syndrome_symptoms in prop::sample::subsequence(SYMPTOM_VOCABULARY.to_vec(), 0..8),
        constitution_symptoms in prop::sample::subsequence(CONSTITUTION_SYMPTOMS.to_vec(), 0..6),
    ) {
        let bag = syndrome_symptoms
            .iter()
            .chain(constitution_symptoms.iter())
            .fold(FeatureBag::new(), |bag, symptom| bag.with_symptom(symptom));

        let syndrome = SyndromeAnalyzer::new(SyndromeSettings::default());
        let first = syndrome.score_patterns(&bag);
        prop_assert_eq!(&first, &syndrome.score_patterns(&bag));
        prop_assert!(first.windows(2).all(|w| w[0].score >= w[1].score));

        let constitution = ConstitutionAnalyzer::new(ConstitutionSettings::default());
        let first = constitution.score_constitutions(&bag);
        prop_assert_eq!(&first, &constitution.score_constitutions(&bag));
        prop_assert!(first.windows(2).all(|w| w[0].normalized_score >= w[1].normalized_score));
    }

    #[test]
    fn one_result_per_requested_modality_in_order(
        order in Just(ModalityKind::ALL.to_vec()).prop_shuffle(),
        count in 1usize..=5,
        failures in prop::collection::vec(any::<bool>(), 5),
    ) {
        let requested: Vec<ModalityKind> = order.into_iter().take(count).collect();
        let registry = ModalityKind::ALL
            .iter()
            .zip(failures)
            .fold(ModalityRegistry::new(), |registry, (modality, fails)| {
                registry.register(Arc::new(FlakyClient { modality: *modality, fails }))
            });
        let coordinator = DiagnosisCoordinator::new(FusionConfig::default(), registry).unwrap();

        let fused = tokio_test::block_on(
            coordinator.coordinate(DiagnosisRequest::new("u1", "s1", requested.clone())),
        )
        .unwrap();

        let order: Vec<ModalityKind> = fused.results.iter().map(|r| r.modality).collect();
        prop_assert_eq!(order, requested);
        prop_assert!(fused.results.iter().all(|r| r.status.is_terminal()));
    }
}
