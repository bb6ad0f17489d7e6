//! HTTP transport: the only place that touches the network.
//!
//! Submission and polling decide what a response *means* (202 vs. anything
//! else, `running` vs. `succeeded`); this module only moves bytes. Keeping the
//! two apart lets the state machine in [`super::poll`] and the status checks
//! in [`super::submit`] run against a scripted [`Transport`] in tests, with
//! exactly the same code paths as production.

use crate::config::OcrConfig;
use crate::error::OcrError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Header carrying the subscription key on every request.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// A fully-buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Add a header. Names are stored lower-cased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_body(value.to_string())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal HTTP surface the pipeline needs.
///
/// Implementations must not interpret status codes: a 500 is an
/// `Ok(HttpResponse { status: 500, .. })`, and only failures to obtain a
/// response at all are `Err(OcrError::Transport { .. })`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST` a JSON body with the subscription-key header.
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, OcrError>;

    /// `GET` with the subscription-key header.
    async fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, OcrError>;
}

/// Production transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with a per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OcrError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (connection pool shared with the caller).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, OcrError> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("submit", e))?;
        buffer_response(response, "submit").await
    }

    async fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, OcrError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| transport_error("poll", e))?;
        buffer_response(response, "poll").await
    }
}

async fn buffer_response(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<HttpResponse, OcrError> {
    let mut out = HttpResponse::new(response.status().as_u16());
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            out = out.with_header(name.as_str(), v);
        }
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(operation, e))?;
    Ok(out.with_body(bytes.to_vec()))
}

fn transport_error(operation: &'static str, e: reqwest::Error) -> OcrError {
    let detail = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    OcrError::Transport { operation, detail }
}

/// Use the caller's transport if one is configured, otherwise build a
/// reqwest client honouring `request_timeout_secs`.
pub fn resolve_transport(config: &OcrConfig) -> Result<Arc<dyn Transport>, OcrError> {
    if let Some(ref transport) = config.transport {
        return Ok(Arc::clone(transport));
    }
    Ok(Arc::new(ReqwestTransport::new(config.request_timeout_secs)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let r = HttpResponse::new(202).with_header("Operation-Location", "https://x/op/1");
        assert_eq!(r.header("operation-location"), Some("https://x/op/1"));
        assert_eq!(r.header("OPERATION-LOCATION"), Some("https://x/op/1"));
        assert_eq!(r.header("retry-after"), None);
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200).is_success());
        assert!(HttpResponse::new(202).is_success());
        assert!(!HttpResponse::new(404).is_success());
        assert!(!HttpResponse::new(500).is_success());
    }

    #[test]
    fn json_body_round_trips_as_text() {
        let r = HttpResponse::new(200).with_json(&serde_json::json!({"status": "running"}));
        assert_eq!(r.body_text(), r#"{"status":"running"}"#);
    }

    #[test]
    fn resolve_builds_default_client() {
        let config = OcrConfig::builder()
            .endpoint("https://ocr.example.com")
            .api_key("k")
            .build()
            .unwrap();
        assert!(resolve_transport(&config).is_ok());
    }
}
