//! Client side of the remote inference endpoint.
//!
//! The endpoint takes one image per request as `multipart/form-data` and
//! answers with a base64 overlay plus the labels it detected. Everything that
//! can go wrong on the way (unreadable file, transport error, non-success
//! status, undecodable body) collapses into `CoreError::AnalysisFailed` for
//! that single file.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::error::CoreError;
use super::RawFile;
use crate::config::AppConfig;

/// Media type of the overlay images returned by the endpoint.
pub const OVERLAY_MEDIA_TYPE: &str = "image/png";

/// Owned buffer holding an annotated overlay image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultHandle {
    bytes: Vec<u8>,
}

impl ResultHandle {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self::from_bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the overlay as a `data:` URL an `<img>` tag can display.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            OVERLAY_MEDIA_TYPE,
            STANDARD.encode(&self.bytes)
        )
    }

    pub fn release(self) {
        tracing::trace!("Released result overlay ({} bytes)", self.len());
    }
}

/// What a successful analysis attaches to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub overlay: ResultHandle,
    pub detected_labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    overlay: String,
    #[serde(default)]
    detected_labels: Vec<String>,
}

/// Decodes a success body from the endpoint.
pub fn parse_prediction(file_name: &str, body: &[u8]) -> Result<AnalysisResult, CoreError> {
    let response: PredictionResponse =
        serde_json::from_slice(body).map_err(|e| CoreError::AnalysisFailed {
            file: file_name.to_string(),
            reason: format!("unexpected response body: {}", e),
        })?;

    let overlay =
        ResultHandle::from_base64(&response.overlay).map_err(|e| CoreError::AnalysisFailed {
            file: file_name.to_string(),
            reason: format!("overlay is not valid base64: {}", e),
        })?;

    Ok(AnalysisResult {
        overlay,
        detected_labels: response.detected_labels,
    })
}

/// The remote inference collaborator.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submits one file and waits for its analysis.
    async fn predict(
        &self,
        file: &RawFile,
        token: Option<&str>,
    ) -> Result<AnalysisResult, CoreError>;
}

/// `InferenceClient` backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInferenceClient {
    /// Builds a client for `endpoint`. Without a timeout, each request may
    /// take as long as the endpoint needs.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.endpoint_url.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn failed(file: &RawFile, reason: impl Into<String>) -> CoreError {
        CoreError::AnalysisFailed {
            file: file.name().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn predict(
        &self,
        file: &RawFile,
        token: Option<&str>,
    ) -> Result<AnalysisResult, CoreError> {
        let bytes = tokio::fs::read(file.path())
            .await
            .map_err(|e| Self::failed(file, format!("could not read file: {}", e)))?;

        let part = Part::bytes(bytes)
            .file_name(file.name().to_string())
            .mime_str(file.media_type())
            .map_err(|e| Self::failed(file, format!("invalid media type: {}", e)))?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Submitting {} to {}", file.name(), self.endpoint);
        let response = request
            .send()
            .await
            .map_err(|e| Self::failed(file, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failed(file, format!("endpoint returned {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::failed(file, format!("could not read response: {}", e)))?;

        parse_prediction(file.name(), &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_prediction_decodes_overlay_and_labels() {
        let body = json!({
            "overlay": STANDARD.encode([1u8, 2, 3]),
            "detected_labels": ["drusen", "exudates"],
        })
        .to_string();

        let result = parse_prediction("a.png", body.as_bytes()).unwrap();
        assert_eq!(result.overlay.as_bytes(), &[1, 2, 3]);
        assert_eq!(result.detected_labels, vec!["drusen", "exudates"]);
    }

    #[test]
    fn test_parse_prediction_defaults_missing_labels_to_empty() {
        let body = json!({ "overlay": STANDARD.encode(b"png") }).to_string();
        let result = parse_prediction("a.png", body.as_bytes()).unwrap();
        assert!(result.detected_labels.is_empty());
    }

    #[test]
    fn test_parse_prediction_rejects_bad_base64() {
        let body = json!({ "overlay": "%%%not-base64%%%", "detected_labels": [] }).to_string();
        let err = parse_prediction("a.png", body.as_bytes()).unwrap_err();
        assert!(matches!(err, CoreError::AnalysisFailed { ref file, .. } if file == "a.png"));
    }

    #[test]
    fn test_parse_prediction_rejects_missing_overlay() {
        let err = parse_prediction("a.png", br#"{"detected_labels": []}"#).unwrap_err();
        assert!(matches!(err, CoreError::AnalysisFailed { .. }));
    }

    #[test]
    fn test_result_handle_data_url() {
        let handle = ResultHandle::from_bytes(vec![0xFF, 0x00]);
        assert_eq!(handle.to_data_url(), "data:image/png;base64,/wA=");
        assert_eq!(handle.len(), 2);
        assert!(!handle.is_empty());
        assert!(ResultHandle::from_bytes(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_before_any_request() {
        let client = HttpInferenceClient::new("http://127.0.0.1:9/predict", None).unwrap();
        let raw = RawFile::new("gone.png", "/definitely/not/here.png", "image/png", 0);

        let err = client.predict(&raw, Some("token")).await.unwrap_err();
        match err {
            CoreError::AnalysisFailed { file, reason } => {
                assert_eq!(file, "gone.png");
                assert!(reason.contains("could not read file"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_analysis_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"png").unwrap();
        let raw = RawFile::new("a.png", &path, "image/png", 3);

        let client = HttpInferenceClient::new(
            format!("http://127.0.0.1:{}/predict", port),
            Some(Duration::from_secs(5)),
        )
        .unwrap();

        let err = client.predict(&raw, None).await.unwrap_err();
        assert!(matches!(err, CoreError::AnalysisFailed { .. }));
    }

    #[test]
    fn test_from_config_uses_endpoint() {
        let config = AppConfig {
            endpoint_url: "http://example.invalid/predict".to_string(),
            request_timeout_secs: Some(30),
            ..Default::default()
        };
        let client = HttpInferenceClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://example.invalid/predict");
    }
}
