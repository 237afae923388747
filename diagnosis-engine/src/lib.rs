//! Multi-modality TCM diagnostic fusion engine
//!
//! This crate turns the output of five independent diagnostic services
//! (looking, listening, inquiry, palpation, calculation) into one report:
//! - Concurrent or sequential dispatch with per-modality failure isolation
//! - Syndrome pattern scoring with combination detection
//! - Nine-type constitution classification with health guidance
//! - Contraindication-aware, ranked health recommendations and a follow-up plan
//!
//! # Pipeline
//!
//! - **Coordinator**: validates the request, calls each [`ModalityClient`]
//!   under a timeout and keeps failed or timed-out calls as results
//! - **Feature rules**: a table of `(feature path, predicate, weight)` rules
//!   scored by one generic matcher
//! - **Analyzers**: [`SyndromeAnalyzer`] and [`ConstitutionAnalyzer`] score
//!   the completed results; [`RecommendationEngine`] builds advice from both
//!
//! # Example
//!
//! ```rust,no_run
//! use diagnosis_engine::{DiagnosisCoordinator, DiagnosisRequest, FusionConfig, ModalityKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FusionConfig::load(None)?;
//!     logger_redacted::init_logging(&config.logging)?;
//!
//!     let coordinator = DiagnosisCoordinator::from_config(config)?;
//!     let request = DiagnosisRequest::new(
//!         "user-1",
//!         "session-1",
//!         vec![ModalityKind::Inquiry, ModalityKind::Palpation],
//!     );
//!
//!     let report = coordinator.coordinate_diagnosis(request).await?;
//!     println!("{} (confidence {:.2})", report.summary, report.overall_confidence);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constitution;
pub mod coordinator;
pub mod error;
pub mod features;
pub mod modality;
pub mod recommendation;
pub mod rules;
pub mod syndrome;
pub mod types;

pub use config::{
    ConstitutionSettings, DispatchPolicy, EndpointConfig, FusionConfig, ModalityWeights,
    RecommendationSettings, ServiceEndpoints, SyndromeSettings,
};
pub use constitution::{ConstitutionAnalysis, ConstitutionAnalyzer, ConstitutionScore, ConstitutionType};
pub use coordinator::{
    weighted_confidence, CoordinationStatus, DiagnosisCoordinator, DiagnosisProgress, SessionTracker,
};
pub use error::{DiagnosisError, Result};
pub use features::FeatureBag;
pub use modality::{
    HttpModalityClient, ModalityClient, ModalityError, ModalityRegistry, ModalityResponse,
    ModalityResult,
};
pub use recommendation::{
    GeneratedRecommendations, Priority, Recommendation, RecommendationEngine, RecommendationPlan,
    RecommendationType,
};
pub use syndrome::{SyndromeAnalysis, SyndromeAnalyzer, SyndromeScore};
pub use types::{
    DiagnosisRequest, DiagnosisResult, DiagnosisStatus, FusedDiagnosisResult, MedicalCondition,
    ModalityKind, UserProfile,
};
