//! Diagnosis coordination.
//!
//! The coordinator validates a request, invokes each requested modality under
//! the request's timeout, records every outcome (failures and timeouts
//! included) in request order, and fuses the completed results through the
//! syndrome, constitution and recommendation stages.

pub mod tracker;

pub use tracker::{CoordinationStatus, DiagnosisProgress, ModalityProgress, SessionTracker};

use chrono::Utc;
use futures::future::join_all;
use itertools::Itertools;
use logger_redacted::IdentifierRedactor;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DispatchPolicy, FusionConfig, ModalityWeights};
use crate::constitution::{ConstitutionAnalysis, ConstitutionAnalyzer};
use crate::error::{DiagnosisError, Result};
use crate::modality::{ModalityClient, ModalityRegistry};
use crate::recommendation::RecommendationEngine;
use crate::syndrome::{SyndromeAnalysis, SyndromeAnalyzer};
use crate::types::{
    DiagnosisRequest, DiagnosisResult, DiagnosisStatus, FusedDiagnosisResult, ModalityKind,
};

const NO_VALID_RESULT: &str = "No valid diagnostic result";

pub struct DiagnosisCoordinator {
    config: FusionConfig,
    registry: ModalityRegistry,
    syndrome_analyzer: SyndromeAnalyzer,
    constitution_analyzer: ConstitutionAnalyzer,
    recommendation_engine: RecommendationEngine,
    tracker: Arc<SessionTracker>,
    redactor: IdentifierRedactor,
}

impl DiagnosisCoordinator {
    /// Create a coordinator over an explicit set of modality clients
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosisError::Configuration`] for invalid settings and
    /// [`DiagnosisError::NoModalityClients`] when the registry is empty.
    pub fn new(config: FusionConfig, registry: ModalityRegistry) -> Result<Self> {
        config.validate_config()?;
        if registry.is_empty() {
            return Err(DiagnosisError::NoModalityClients);
        }

        info!(
            modalities = registry.len(),
            policy = ?config.dispatch_policy,
            default_timeout_ms = config.default_timeout_ms,
            "Diagnosis coordinator initialized"
        );

        Ok(Self {
            syndrome_analyzer: SyndromeAnalyzer::new(config.syndrome.clone()),
            constitution_analyzer: ConstitutionAnalyzer::new(config.constitution.clone()),
            recommendation_engine: RecommendationEngine::new(config.recommendation.clone()),
            tracker: Arc::new(SessionTracker::new()),
            redactor: IdentifierRedactor::new(&config.logging),
            registry,
            config,
        })
    }

    /// Create a coordinator with HTTP clients for every configured service
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosisError::Configuration`] when a client cannot be built,
    /// plus the errors of [`DiagnosisCoordinator::new`].
    pub fn from_config(config: FusionConfig) -> Result<Self> {
        let registry = ModalityRegistry::from_config(&config.services)
            .map_err(|e| DiagnosisError::Configuration(e.to_string()))?;
        Self::new(config, registry)
    }

    /// Share progress bookkeeping with another owner
    pub fn with_tracker(mut self, tracker: Arc<SessionTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> Arc<SessionTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Run one full coordination
    ///
    /// # Errors
    ///
    /// Only [`DiagnosisError::Validation`] is returned, before any modality is
    /// called. Modality failures and timeouts are recorded on the results.
    pub async fn coordinate(&self, request: DiagnosisRequest) -> Result<FusedDiagnosisResult> {
        request.validate_request()?;

        let coordination_id = Uuid::new_v4();
        info!(
            %coordination_id,
            user = %self.redactor.redact(&request.user_id),
            session = %self.redactor.redact(&request.session_id),
            modalities = request.modalities.len(),
            policy = ?self.config.dispatch_policy,
            "Starting diagnosis coordination"
        );

        self.tracker.begin(coordination_id, &request);
        let results = self.dispatch(coordination_id, &request).await;

        self.tracker.set_status(coordination_id, CoordinationStatus::Fusing);
        let fused = self.fuse(coordination_id, &request, results);

        let status = if fused.is_empty() {
            CoordinationStatus::Failed
        } else {
            CoordinationStatus::Completed
        };
        self.tracker.set_status(coordination_id, status);

        info!(
            %coordination_id,
            status = ?status,
            overall_confidence = fused.overall_confidence,
            recommendations = fused.recommendations.len(),
            "Diagnosis coordination finished"
        );
        Ok(fused)
    }

    /// Alias of [`coordinate`](Self::coordinate) for the API layer
    ///
    /// # Errors
    ///
    /// See [`coordinate`](Self::coordinate).
    pub async fn coordinate_diagnosis(&self, request: DiagnosisRequest) -> Result<FusedDiagnosisResult> {
        self.coordinate(request).await
    }

    /// Progress of the most recent coordination for a session
    pub fn get_diagnosis_progress(&self, session_id: &str) -> Option<DiagnosisProgress> {
        self.tracker.latest_for_session(session_id)
    }

    /// Drop the bookkeeping of a session; returns the number of coordinations removed
    pub fn cleanup_session(&self, session_id: &str) -> usize {
        let removed = self.tracker.cleanup_session(session_id);
        debug!(
            session = %self.redactor.redact(session_id),
            removed,
            "Session cleaned up"
        );
        removed
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Invoke every requested modality. The returned list has one entry per
    /// requested modality, in request order.
    pub async fn dispatch(&self, coordination_id: Uuid, request: &DiagnosisRequest) -> Vec<DiagnosisResult> {
        let invocations: Vec<(Invocation, Option<Arc<dyn ModalityClient>>)> = request
            .modalities
            .iter()
            .map(|modality| {
                let invocation = Invocation {
                    coordination_id,
                    request_id: request.request_id,
                    modality: *modality,
                    user_id: request.user_id.clone(),
                    session_id: request.session_id.clone(),
                    data: request.input_for(*modality),
                    timeout: request.effective_timeout(self.config.modality_timeout(*modality)),
                    tracker: Arc::clone(&self.tracker),
                };
                (invocation, self.registry.get(*modality))
            })
            .collect();

        match self.config.dispatch_policy {
            DispatchPolicy::Parallel => self.dispatch_parallel(request.request_id, invocations).await,
            DispatchPolicy::Sequential => Self::dispatch_sequential(invocations).await,
        }
    }

    async fn dispatch_parallel(
        &self,
        request_id: Uuid,
        invocations: Vec<(Invocation, Option<Arc<dyn ModalityClient>>)>,
    ) -> Vec<DiagnosisResult> {
        let modalities: Vec<ModalityKind> = invocations.iter().map(|(inv, _)| inv.modality).collect();
        let coordination_id = invocations.first().map(|(inv, _)| inv.coordination_id);

        let handles = invocations
            .into_iter()
            .map(|(invocation, client)| tokio::spawn(invocation.run(client)));
        let outcomes = join_all(handles).await;

        modalities
            .into_iter()
            .zip(outcomes)
            .map(|(modality, outcome)| {
                outcome.unwrap_or_else(|e| {
                    warn!(%modality, error = %e, "Modality task aborted");
                    if let Some(id) = coordination_id {
                        self.tracker.set_modality_status(id, modality, DiagnosisStatus::Failed);
                    }
                    DiagnosisResult::failed(
                        request_id,
                        modality,
                        format!("modality task aborted: {e}"),
                        Utc::now(),
                        0,
                    )
                })
            })
            .collect()
    }

    async fn dispatch_sequential(
        invocations: Vec<(Invocation, Option<Arc<dyn ModalityClient>>)>,
    ) -> Vec<DiagnosisResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for (invocation, client) in invocations {
            results.push(invocation.run(client).await);
        }
        results
    }

    // ========================================================================
    // Fusion
    // ========================================================================

    /// Combine modality results into the final report. Only completed results
    /// feed the analyzers; all results are kept on the report.
    pub fn fuse(
        &self,
        coordination_id: Uuid,
        request: &DiagnosisRequest,
        results: Vec<DiagnosisResult>,
    ) -> FusedDiagnosisResult {
        let valid: Vec<DiagnosisResult> = results.iter().filter(|r| r.is_completed()).cloned().collect();

        if valid.is_empty() {
            warn!(
                %coordination_id,
                requested = results.len(),
                "No modality produced a usable result"
            );
            return FusedDiagnosisResult {
                coordination_id,
                user_id: request.user_id.clone(),
                session_id: request.session_id.clone(),
                summary: format!("{NO_VALID_RESULT} ({})", failure_counts(&results)),
                results,
                syndrome_analysis: SyndromeAnalysis::empty(),
                constitution_analysis: ConstitutionAnalysis::empty(),
                recommendations: Vec::new(),
                filtered_recommendations: Vec::new(),
                recommendation_plan: None,
                overall_confidence: 0.0,
                created_at: Utc::now(),
            };
        }

        let syndrome_analysis = self.syndrome_analyzer.analyze(&valid);
        let constitution_analysis = self.constitution_analyzer.analyze(&valid);
        let generated = self.recommendation_engine.generate(
            &syndrome_analysis,
            &constitution_analysis,
            &valid,
            request.user_profile.as_ref(),
        );

        let recommendation_plan = (!generated.recommendations.is_empty()).then(|| {
            self.recommendation_engine.create_recommendation_plan(
                &request.user_id,
                &request.session_id,
                generated.recommendations.clone(),
            )
        });

        let overall_confidence = weighted_confidence(&self.config.modality_weights, &valid);
        let summary = summarize(
            &results,
            &syndrome_analysis,
            &constitution_analysis,
            generated.recommendations.len(),
        );

        FusedDiagnosisResult {
            coordination_id,
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            results,
            syndrome_analysis,
            constitution_analysis,
            recommendations: generated.recommendations,
            filtered_recommendations: generated.filtered,
            recommendation_plan,
            overall_confidence,
            summary,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for DiagnosisCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisCoordinator")
            .field("registry", &self.registry)
            .field("policy", &self.config.dispatch_policy)
            .field("tracked", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

/// One modality call with everything it needs to run on its own task
struct Invocation {
    coordination_id: Uuid,
    request_id: Uuid,
    modality: ModalityKind,
    user_id: String,
    session_id: String,
    data: Value,
    timeout: Duration,
    tracker: Arc<SessionTracker>,
}

impl Invocation {
    /// Never fails: errors and timeouts become the matching result variant
    async fn run(self, client: Option<Arc<dyn ModalityClient>>) -> DiagnosisResult {
        let started_at = Utc::now();
        let started = Instant::now();
        self.tracker
            .set_modality_status(self.coordination_id, self.modality, DiagnosisStatus::InProgress);

        let result = match client {
            None => DiagnosisResult::failed(
                self.request_id,
                self.modality,
                format!("no client registered for {}", self.modality),
                started_at,
                0,
            ),
            Some(client) => {
                let outcome = tokio::time::timeout(
                    self.timeout,
                    client.analyze(&self.user_id, &self.session_id, &self.data),
                )
                .await;
                let elapsed_ms = elapsed_millis(started);

                match outcome {
                    Ok(Ok(response)) => match response.check() {
                        Ok(()) => DiagnosisResult::completed(
                            self.request_id,
                            self.modality,
                            response,
                            started_at,
                            elapsed_ms,
                        ),
                        Err(e) => {
                            DiagnosisResult::failed(self.request_id, self.modality, e.to_string(), started_at, elapsed_ms)
                        }
                    },
                    Ok(Err(e)) => {
                        DiagnosisResult::failed(self.request_id, self.modality, e.to_string(), started_at, elapsed_ms)
                    }
                    Err(_) => DiagnosisResult::timed_out(
                        self.request_id,
                        self.modality,
                        self.timeout,
                        started_at,
                        elapsed_ms,
                    ),
                }
            }
        };

        if result.is_completed() {
            debug!(
                coordination_id = %self.coordination_id,
                modality = %self.modality,
                confidence = result.confidence,
                elapsed_ms = result.elapsed_ms,
                "Modality completed"
            );
        } else {
            warn!(
                coordination_id = %self.coordination_id,
                modality = %self.modality,
                status = result.status.as_str(),
                elapsed_ms = result.elapsed_ms,
                error = result.error_message.as_deref().unwrap_or_default(),
                "Modality did not complete"
            );
        }

        self.tracker
            .set_modality_status(self.coordination_id, self.modality, result.status);
        result
    }
}

fn elapsed_millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Weighted mean of completed results' confidences. Modalities without a
/// completed result contribute to neither sum.
pub fn weighted_confidence(weights: &ModalityWeights, results: &[DiagnosisResult]) -> f64 {
    let (weighted, total) = results
        .iter()
        .filter(|r| r.is_completed())
        .fold((0.0, 0.0), |(weighted, total), r| {
            let weight = weights.weight(r.modality);
            (weighted + r.confidence * weight, total + weight)
        });

    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

fn failure_counts(results: &[DiagnosisResult]) -> String {
    let failed = results.iter().filter(|r| r.status == DiagnosisStatus::Failed).count();
    let timed_out = results.iter().filter(|r| r.status == DiagnosisStatus::Timeout).count();
    format!("{failed} failed, {timed_out} timed out")
}

fn summarize(
    results: &[DiagnosisResult],
    syndrome: &SyndromeAnalysis,
    constitution: &ConstitutionAnalysis,
    recommendation_count: usize,
) -> String {
    let completed = results.iter().filter(|r| r.is_completed()).map(|r| r.modality).join(", ");

    let pattern = syndrome.top_pattern().map_or_else(
        || "No primary syndrome pattern identified".to_string(),
        |top| format!("Primary pattern: {} ({:.1})", top.name, top.score),
    );
    let dominant = constitution.dominant_type().map_or_else(
        || "No dominant constitution".to_string(),
        |c| format!("Dominant constitution: {c}"),
    );

    format!(
        "Completed modalities: {completed} ({}). {pattern}. {dominant}. {recommendation_count} recommendation(s).",
        failure_counts(results)
    )
}
