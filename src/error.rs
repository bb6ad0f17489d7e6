//! Error types for the edgequake-img2txt library.
//!
//! A single error type, [`OcrError`], covers every way a document can fail.
//! The pipeline is all-or-nothing per document: any variant returned from
//! [`crate::recognize::recognize`] means no text was produced for it.
//!
//! The remote-job variants map one-to-one onto the stages that can raise them:
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | [`OcrError::Transport`] | submit or poll (connection, TLS, timeout) |
//! | [`OcrError::UnexpectedStatus`] | submit (anything but 202), poll (non-2xx) |
//! | [`OcrError::AnalysisFailed`] | poll observed `failed` |
//! | [`OcrError::TimedOut`] | poll deadline or attempt cap reached |
//! | [`OcrError::InvalidStructure`] | poll body or extraction shape mismatch |

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-img2txt library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Remote job errors ─────────────────────────────────────────────────
    /// Network-level failure talking to the OCR service.
    #[error("Transport error during {operation}: {detail}")]
    Transport {
        operation: &'static str,
        detail: String,
    },

    /// The service answered with a status code the operation does not accept.
    #[error("Unexpected response status {status} during {operation}{suffix}", suffix = body_suffix(.body))]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The service reported that the analysis job failed.
    #[error("Document analysis failed: {message}")]
    AnalysisFailed { message: String },

    /// A response did not have the shape we rely on.
    #[error("Invalid JSON structure: {detail}")]
    InvalidStructure { detail: String },

    /// The job did not reach a terminal state within the poll budget.
    #[error("Analysis did not finish after {attempts} polls ({elapsed_ms}ms)\nIncrease --poll-timeout or --max-polls.")]
    TimedOut { attempts: u32, elapsed_ms: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The payload has zero bytes.
    #[error("Please upload a file: document is empty")]
    EmptyDocument,

    /// The payload exceeds the configured upload limit.
    #[error("File size is too large ({size} bytes). Please upload a file less than {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    /// The payload is not one of the supported image formats.
    #[error("Not an image! Please upload an image. First bytes: {magic:?}")]
    NotAnImage { magic: Vec<u8> },

    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A publish was attempted without a title.
    #[error("Please provide a title")]
    MissingTitle,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// True for errors produced by the remote service or the network, as
    /// opposed to local validation failures.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            OcrError::Transport { .. }
                | OcrError::UnexpectedStatus { .. }
                | OcrError::AnalysisFailed { .. }
                | OcrError::InvalidStructure { .. }
                | OcrError::TimedOut { .. }
        )
    }
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else if body.chars().count() > 200 {
        let head: String = body.chars().take(200).collect();
        format!(": {head}\u{2026}")
    } else {
        format!(": {body}")
    }
}
