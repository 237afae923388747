//! Modality service clients.
//!
//! Each of the five diagnostic channels is an external service exposing one
//! `analyze` capability. The coordinator only sees the [`ModalityClient`]
//! trait, so services can be reached over HTTP or replaced in tests.

pub mod http;

pub use http::HttpModalityClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ServiceEndpoints;
use crate::types::ModalityKind;

/// Errors from a single modality call. These never reach the caller of the
/// pipeline; the coordinator records them on the failed result.
#[derive(Error, Debug)]
pub enum ModalityError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Service rejected the request: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type ModalityResult<T> = Result<T, ModalityError>;

/// What a modality service returns from `analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityResponse {
    pub confidence: f64,
    #[serde(default)]
    pub features: Map<String, Value>,
    #[serde(default)]
    pub raw: Value,
}

impl ModalityResponse {
    pub fn new(confidence: f64, features: Map<String, Value>) -> Self {
        Self {
            confidence,
            features,
            raw: Value::Null,
        }
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Reject responses whose confidence is not a probability
    ///
    /// # Errors
    ///
    /// Returns [`ModalityError::MalformedResponse`] for non-finite or
    /// out-of-range confidence values.
    pub fn check(&self) -> ModalityResult<()> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModalityError::MalformedResponse(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Capability exposed by every modality service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModalityClient: Send + Sync {
    /// The channel this client serves
    fn modality(&self) -> ModalityKind;

    /// Analyze one payload for a user session
    async fn analyze(
        &self,
        user_id: &str,
        session_id: &str,
        data: &Value,
    ) -> ModalityResult<ModalityResponse>;
}

/// The set of clients available to a coordinator, one per modality
#[derive(Clone, Default)]
pub struct ModalityRegistry {
    clients: HashMap<ModalityKind, Arc<dyn ModalityClient>>,
}

impl ModalityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client, replacing any existing one for the same modality
    pub fn register(mut self, client: Arc<dyn ModalityClient>) -> Self {
        self.insert(client);
        self
    }

    pub fn insert(&mut self, client: Arc<dyn ModalityClient>) {
        self.clients.insert(client.modality(), client);
    }

    pub fn get(&self, modality: ModalityKind) -> Option<Arc<dyn ModalityClient>> {
        self.clients.get(&modality).cloned()
    }

    pub fn contains(&self, modality: ModalityKind) -> bool {
        self.clients.contains_key(&modality)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Build HTTP clients for every configured endpoint
    ///
    /// # Errors
    ///
    /// Returns an error when an HTTP client cannot be constructed.
    pub fn from_config(services: &ServiceEndpoints) -> ModalityResult<Self> {
        let mut registry = Self::new();
        for modality in ModalityKind::ALL {
            if let Some(endpoint) = services.get(modality) {
                let client = HttpModalityClient::new(modality, endpoint)?;
                registry.insert(Arc::new(client));
            }
        }
        Ok(registry)
    }
}

impl std::fmt::Debug for ModalityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.clients.keys().collect();
        kinds.sort();
        f.debug_struct("ModalityRegistry").field("modalities", &kinds).finish()
    }
}
