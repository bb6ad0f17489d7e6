//! # edgequake-img2txt
//!
//! Extract text from images with the Azure AI Document Intelligence
//! `analyze` API.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Input    size + magic-byte checks (no request for bad input)
//!  ├─ 2. Submit   POST base64 payload → 202 + operation-location
//!  ├─ 3. Poll     GET operation-location every 2s until succeeded / failed
//!  ├─ 4. Extract  analyzeResult.paragraphs[].content → joined, trimmed text
//!  └─ 5. Publish  optional: hand the text to a Publisher (e.g. .txt files)
//! ```
//!
//! Analysis is asynchronous on the service side, so a document costs one
//! submit plus a handful of polls. Polling is bounded by
//! [`OcrConfig::poll_timeout_secs`] and [`OcrConfig::max_poll_attempts`];
//! a job that never finishes ends in [`OcrError::TimedOut`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2txt::{recognize, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads AZURE_DOCUMENT_ENDPOINT / AZURE_DOCUMENT_KEY / MODEL_ID
//!     let config = OcrConfig::from_env()?;
//!     let bytes = std::fs::read("page.jpg")?;
//!     let text = recognize(&bytes, &config).await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without the service
//!
//! Every stage talks to the network through [`Transport`]. Inject a
//! [`MockTransport`] via [`OcrConfigBuilder::transport`] to script responses.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2txt` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod recognize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    archive_source, recognize_batch, recognize_batch_stream, scan_directory, BatchItem,
    BatchOutcome, BatchStream,
};
pub use config::{OcrConfig, OcrConfigBuilder, ParagraphDelimiter};
pub use error::OcrError;
pub use output::{RecognitionOutput, RecognitionStats};
pub use pipeline::extract::{extract_content, Extraction};
pub use pipeline::mock::MockTransport;
pub use pipeline::poll::{AnalysisResult, JobStatus, PollState};
pub use pipeline::submit::JobHandle;
pub use pipeline::transport::{HttpResponse, ReqwestTransport, Transport};
pub use progress::{NoopProgressCallback, ProgressCallback, RecognitionProgressCallback};
pub use publish::{FilePublisher, Post, PublishReceipt, Publisher};
pub use recognize::{recognize, recognize_file, recognize_sync, recognize_with_stats};
