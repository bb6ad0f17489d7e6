//! Configuration types for image-to-text recognition.
//!
//! All behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`] or loaded once from the environment with
//! [`OcrConfig::from_env`]. The config is immutable once built and is passed
//! explicitly to every stage, so tests can point the pipeline at a fake
//! endpoint and an in-memory [`Transport`] without touching process state.

use crate::error::OcrError;
use crate::pipeline::transport::Transport;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the service endpoint URL.
pub const ENV_ENDPOINT: &str = "AZURE_DOCUMENT_ENDPOINT";
/// Environment variable holding the subscription key.
pub const ENV_KEY: &str = "AZURE_DOCUMENT_KEY";
/// Environment variable overriding the model identifier.
pub const ENV_MODEL_ID: &str = "MODEL_ID";
/// Environment variable overriding the API version.
pub const ENV_API_VERSION: &str = "AZURE_DOCUMENT_API_VERSION";

pub const DEFAULT_MODEL_ID: &str = "prebuilt-read";
pub const DEFAULT_API_VERSION: &str = "2024-02-29-preview";
pub const DEFAULT_API_PATH: &str = "documentintelligence";

/// Configuration for recognising one or more documents.
///
/// # Example
/// ```rust
/// use edgequake_img2txt::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .endpoint("https://example.cognitiveservices.azure.com")
///     .api_key("secret")
///     .poll_interval_ms(1000)
///     .build()
///     .unwrap();
/// assert_eq!(config.model_id, "prebuilt-read");
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Service root, e.g. `https://<name>.cognitiveservices.azure.com`.
    pub endpoint: String,

    /// Value sent in the `Ocp-Apim-Subscription-Key` header.
    pub api_key: String,

    /// Analysis model. Default: `prebuilt-read`.
    pub model_id: String,

    /// `api-version` query parameter. Default: `2024-02-29-preview`.
    pub api_version: String,

    /// Path segment between the endpoint and `documentModels`.
    /// Default: `documentintelligence`. Empty means none.
    pub api_path: String,

    /// Delay between status polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Give up polling after this many seconds. Default: 300.
    pub poll_timeout_secs: u64,

    /// Give up polling after this many status requests. Default: no cap.
    pub max_poll_attempts: Option<u32>,

    /// Per-HTTP-request timeout in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Largest accepted payload in bytes. Default: 5 MiB.
    pub max_upload_bytes: usize,

    /// Separator placed between extracted paragraphs. Default: newline.
    pub delimiter: ParagraphDelimiter,

    /// Documents processed at once in batch mode. Default: 4.
    pub concurrency: usize,

    /// Pre-constructed transport. If None, a reqwest client is created.
    pub transport: Option<Arc<dyn Transport>>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            poll_interval_ms: 2000,
            poll_timeout_secs: 300,
            max_poll_attempts: None,
            request_timeout_secs: 30,
            max_upload_bytes: 5 * 1024 * 1024,
            delimiter: ParagraphDelimiter::default(),
            concurrency: 4,
            transport: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("api_path", &self.api_path)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("delimiter", &self.delimiter)
            .field("concurrency", &self.concurrency)
            .field("transport", &self.transport.as_ref().map(|_| "<dyn Transport>"))
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load endpoint, key, model and API version from the environment.
    ///
    /// `AZURE_DOCUMENT_ENDPOINT` and `AZURE_DOCUMENT_KEY` are required;
    /// `MODEL_ID` and `AZURE_DOCUMENT_API_VERSION` fall back to the defaults.
    pub fn from_env() -> Result<OcrConfig, OcrError> {
        Self::builder_from_env().build()
    }

    /// Like [`OcrConfig::from_env`] but returns the builder so callers can
    /// layer further settings on top before validating.
    pub fn builder_from_env() -> OcrConfigBuilder {
        let mut builder = Self::builder();
        if let Some(v) = non_empty_var(ENV_ENDPOINT) {
            builder = builder.endpoint(v);
        }
        if let Some(v) = non_empty_var(ENV_KEY) {
            builder = builder.api_key(v);
        }
        if let Some(v) = non_empty_var(ENV_MODEL_ID) {
            builder = builder.model_id(v);
        }
        if let Some(v) = non_empty_var(ENV_API_VERSION) {
            builder = builder.api_version(v);
        }
        builder
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.config.api_path = path.into().trim_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs;
        self
    }

    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = Some(attempts);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn delimiter(mut self, delimiter: ParagraphDelimiter) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.endpoint.is_empty() {
            return Err(OcrError::InvalidConfig(format!(
                "endpoint is not set (export {ENV_ENDPOINT} or pass --endpoint)"
            )));
        }
        if !(c.endpoint.starts_with("https://") || c.endpoint.starts_with("http://")) {
            return Err(OcrError::InvalidConfig(format!(
                "endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.api_key.trim().is_empty() {
            return Err(OcrError::InvalidConfig(format!(
                "subscription key is not set (export {ENV_KEY} or pass --key)"
            )));
        }
        if c.model_id.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model id must not be empty".into()));
        }
        if c.api_version.trim().is_empty() {
            return Err(OcrError::InvalidConfig("API version must not be empty".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(OcrError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        if c.poll_timeout_secs == 0 {
            return Err(OcrError::InvalidConfig("poll timeout must be ≥ 1s".into()));
        }
        if c.max_poll_attempts == Some(0) {
            return Err(OcrError::InvalidConfig("max poll attempts must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How to join paragraphs in the extracted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParagraphDelimiter {
    /// One paragraph per line: "\n". (default)
    #[default]
    Newline,
    /// Paragraphs run together as one line: " ".
    Space,
    /// Blank line between paragraphs: "\n\n".
    BlankLine,
    /// Custom string inserted between paragraphs.
    Custom(String),
}

impl ParagraphDelimiter {
    pub fn as_str(&self) -> &str {
        match self {
            ParagraphDelimiter::Newline => "\n",
            ParagraphDelimiter::Space => " ",
            ParagraphDelimiter::BlankLine => "\n\n",
            ParagraphDelimiter::Custom(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> OcrConfigBuilder {
        OcrConfig::builder()
            .endpoint("https://ocr.example.com/")
            .api_key("k")
    }

    #[test]
    fn defaults() {
        let c = valid().build().unwrap();
        assert_eq!(c.endpoint, "https://ocr.example.com");
        assert_eq!(c.model_id, "prebuilt-read");
        assert_eq!(c.api_version, "2024-02-29-preview");
        assert_eq!(c.poll_interval_ms, 2000);
        assert_eq!(c.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(c.max_poll_attempts, None);
        assert_eq!(c.delimiter, ParagraphDelimiter::Newline);
    }

    #[test]
    fn missing_endpoint_rejected() {
        let err = OcrConfig::builder().api_key("k").build().unwrap_err();
        assert!(err.to_string().contains(ENV_ENDPOINT), "got: {err}");
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let err = OcrConfig::builder()
            .endpoint("ftp://x")
            .api_key("k")
            .build()
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
    }

    #[test]
    fn missing_key_rejected() {
        let err = OcrConfig::builder()
            .endpoint("https://x")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains(ENV_KEY), "got: {err}");
    }

    #[test]
    fn zero_attempt_cap_rejected() {
        assert!(valid().max_poll_attempts(0).build().is_err());
        assert!(valid().max_poll_attempts(1).build().is_ok());
    }

    #[test]
    fn debug_redacts_key() {
        let c = valid().api_key("super-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn api_path_is_trimmed() {
        let c = valid().api_path("/formrecognizer/").build().unwrap();
        assert_eq!(c.api_path, "formrecognizer");
    }

    #[test]
    fn delimiter_strings() {
        assert_eq!(ParagraphDelimiter::Newline.as_str(), "\n");
        assert_eq!(ParagraphDelimiter::Space.as_str(), " ");
        assert_eq!(ParagraphDelimiter::BlankLine.as_str(), "\n\n");
        assert_eq!(ParagraphDelimiter::Custom(" | ".into()).as_str(), " | ");
    }
}
