//! HTTP client for a remote modality service.
//!
//! Services accept `POST {base_url}/api/v1/analyze` with
//! `{user_id, session_id, data}` and answer with
//! `{"success": true, "data": {confidence, features, raw}}`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{ModalityClient, ModalityError, ModalityResponse, ModalityResult};
use crate::config::{EndpointConfig, ServiceEndpoints};
use crate::types::ModalityKind;

const ANALYZE_PATH: &str = "/api/v1/analyze";

pub struct HttpModalityClient {
    modality: ModalityKind,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpModalityClient {
    /// # Errors
    ///
    /// Returns [`ModalityError::Http`] when the underlying client cannot be built.
    pub fn new(modality: ModalityKind, config: &EndpointConfig) -> ModalityResult<Self> {
        let timeout = config
            .timeout_ms
            .map_or_else(|| ServiceEndpoints::default_timeout(modality), Duration::from_millis);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            modality,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), ANALYZE_PATH),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModalityClient for HttpModalityClient {
    fn modality(&self) -> ModalityKind {
        self.modality
    }

    async fn analyze(
        &self,
        user_id: &str,
        session_id: &str,
        data: &Value,
    ) -> ModalityResult<ModalityResponse> {
        debug!(modality = %self.modality, endpoint = %self.endpoint, "Calling modality service");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "user_id": user_id,
                "session_id": session_id,
                "data": data,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModalityError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        parse_envelope(body)
    }
}

/// Unwrap the service envelope into a checked response
pub(crate) fn parse_envelope(body: Value) -> ModalityResult<ModalityResponse> {
    let Value::Object(mut envelope) = body else {
        return Err(ModalityError::MalformedResponse(
            "response body is not an object".to_string(),
        ));
    };

    if envelope.get("success").and_then(Value::as_bool) == Some(false) {
        let message = envelope
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unspecified error")
            .to_string();
        return Err(ModalityError::Rejected(message));
    }

    let payload = match envelope.remove("data") {
        Some(data @ Value::Object(_)) => data,
        Some(_) => {
            return Err(ModalityError::MalformedResponse(
                "data field is not an object".to_string(),
            ))
        }
        None => Value::Object(envelope),
    };

    let response: ModalityResponse = serde_json::from_value(payload)
        .map_err(|e| ModalityError::MalformedResponse(e.to_string()))?;
    response.check()?;
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_path() {
        let client = HttpModalityClient::new(
            ModalityKind::Looking,
            &EndpointConfig {
                base_url: "http://look-service:8080/".to_string(),
                timeout_ms: None,
            },
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://look-service:8080/api/v1/analyze");
        assert_eq!(client.modality(), ModalityKind::Looking);
    }

    #[test]
    fn test_parse_wrapped_envelope() {
        let body = json!({
            "success": true,
            "data": {
                "confidence": 0.82,
                "features": {"pulse_analysis": {"pulse_depth": "沉"}},
                "raw": {"model": "v2"}
            }
        });
        let response = parse_envelope(body).unwrap();
        assert_eq!(response.confidence, 0.82);
        assert!(response.features.contains_key("pulse_analysis"));
        assert_eq!(response.raw["model"], "v2");
    }

    #[test]
    fn test_parse_bare_object() {
        let response = parse_envelope(json!({"confidence": 0.5})).unwrap();
        assert!(response.features.is_empty());
        assert!(response.raw.is_null());
    }

    #[test]
    fn test_rejected_envelope() {
        let err = parse_envelope(json!({"success": false, "error": "image unreadable"})).unwrap_err();
        assert!(matches!(err, ModalityError::Rejected(ref m) if m == "image unreadable"));
    }

    #[test]
    fn test_malformed_envelopes() {
        assert!(matches!(
            parse_envelope(json!([1, 2])),
            Err(ModalityError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_envelope(json!({"data": "oops"})),
            Err(ModalityError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_envelope(json!({"features": {}})),
            Err(ModalityError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_envelope(json!({"confidence": 3.0})),
            Err(ModalityError::MalformedResponse(_))
        ));
    }
}
