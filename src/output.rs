//! Output types returned by the recognition entry points.

use crate::pipeline::submit::JobHandle;
use serde::Serialize;

/// Text extracted from one document, plus how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionOutput {
    pub text: String,
    pub stats: RecognitionStats,
}

/// Timing and bookkeeping for one recognition.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionStats {
    /// Job handle returned by the service.
    pub handle: JobHandle,
    /// Status requests issued, including the terminal one.
    pub poll_attempts: u32,
    /// Paragraphs that contributed text.
    pub paragraphs: usize,
    /// Paragraphs skipped for lacking content.
    pub skipped_paragraphs: usize,
    pub payload_bytes: usize,
    pub submit_duration_ms: u64,
    pub poll_duration_ms: u64,
    pub total_duration_ms: u64,
}
