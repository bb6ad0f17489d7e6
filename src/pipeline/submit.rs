//! Job submission: send a document to the analyze operation and obtain the
//! URI of the in-progress job.
//!
//! The analyze operation is asynchronous. A successful call returns
//! `202 Accepted` with no body and an `operation-location` header; that URI is
//! the only thing needed to follow the job afterwards. Any other status means
//! the job was never created, so we fail instead of polling.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::encode::encode_document;
use crate::pipeline::transport::Transport;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Status code signalling the job was accepted for asynchronous processing.
pub const ACCEPTED: u16 = 202;

/// Response header naming the job's status URI.
pub const OPERATION_LOCATION: &str = "operation-location";

/// Opaque URI identifying one submitted analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the analyze URL for the configured endpoint, model and API version.
pub fn analyze_url(config: &OcrConfig) -> String {
    let mut base = config.endpoint.clone();
    if !config.api_path.is_empty() {
        base.push('/');
        base.push_str(&config.api_path);
    }
    format!(
        "{}/documentModels/{}:analyze?_overload=analyzeDocument&api-version={}",
        base, config.model_id, config.api_version
    )
}

/// Submit `bytes` for analysis and return the job handle.
///
/// One request, no retries. Transport failures come back unchanged.
pub async fn submit_document(
    transport: &dyn Transport,
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<JobHandle, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::EmptyDocument);
    }

    let url = analyze_url(config);
    let body = encode_document(bytes);
    let response = transport.post_json(&url, &config.api_key, &body).await?;

    if response.status != ACCEPTED {
        debug!("Submit rejected with HTTP {}", response.status);
        return Err(OcrError::UnexpectedStatus {
            operation: "submit",
            status: response.status,
            body: response.body_text(),
        });
    }

    let location = response
        .header(OPERATION_LOCATION)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OcrError::InvalidStructure {
            detail: format!("{ACCEPTED} response is missing the '{OPERATION_LOCATION}' header"),
        })?;

    info!("Document analysis initiated. Operation URL: {}", location);
    Ok(JobHandle::new(location))
}
