//! Result extraction: flatten `analyzeResult.paragraphs[].content` to text.
//!
//! Paragraphs are taken in the order the service returns them, which is its
//! reading order. A paragraph without usable `content` is skipped rather than
//! failing the document; a missing `analyzeResult` or `paragraphs` array fails
//! the whole extraction, since there is then no way to tell "no text" from
//! "wrong payload".

use crate::config::ParagraphDelimiter;
use crate::error::OcrError;
use crate::pipeline::poll::AnalysisResult;
use serde::Serialize;
use tracing::debug;

/// Extracted text plus paragraph bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub text: String,
    /// Paragraphs that contributed text.
    pub paragraphs: usize,
    /// Paragraphs dropped for lacking a non-empty `content` string.
    pub skipped: usize,
}

/// Flatten an analysis result, joining paragraphs with `delimiter` and
/// trimming the result.
pub fn extract(
    result: &AnalysisResult,
    delimiter: &ParagraphDelimiter,
) -> Result<Extraction, OcrError> {
    let analyze = result
        .as_json()
        .get("analyzeResult")
        .filter(|v| v.is_object())
        .ok_or_else(|| OcrError::InvalidStructure {
            detail: "missing 'analyzeResult' object".into(),
        })?;

    let paragraphs = analyze
        .get("paragraphs")
        .and_then(|p| p.as_array())
        .ok_or_else(|| OcrError::InvalidStructure {
            detail: "missing 'analyzeResult.paragraphs' array".into(),
        })?;

    let contents: Vec<&str> = paragraphs
        .iter()
        .filter_map(|p| p.get("content").and_then(|c| c.as_str()))
        .filter(|c| !c.is_empty())
        .collect();
    let skipped = paragraphs.len() - contents.len();
    if skipped > 0 {
        debug!("Skipped {} paragraphs without content", skipped);
    }

    let text = contents.join(delimiter.as_str()).trim().to_string();
    Ok(Extraction {
        text,
        paragraphs: contents.len(),
        skipped,
    })
}

/// [`extract`] without the bookkeeping.
pub fn extract_content(
    result: &AnalysisResult,
    delimiter: &ParagraphDelimiter,
) -> Result<String, OcrError> {
    extract(result, delimiter).map(|e| e.text)
}
