//! Single-document entry points: submit → poll → extract.
//!
//! Every function here is all-or-nothing. Each stage only runs if the one
//! before it succeeded, and the first error is returned unchanged: a failed
//! submit never polls, a failed poll never extracts, and no partial text is
//! ever returned alongside an error.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::output::{RecognitionOutput, RecognitionStats};
use crate::pipeline::transport::{resolve_transport, Transport};
use crate::pipeline::{extract, input, poll, submit};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Title reported to progress callbacks for untitled buffers.
const UNTITLED: &str = "document";

/// Recognise an in-memory image and return its text.
///
/// # Errors
/// Input validation errors before any request is made, then
/// [`OcrError::Transport`], [`OcrError::UnexpectedStatus`],
/// [`OcrError::AnalysisFailed`], [`OcrError::TimedOut`] or
/// [`OcrError::InvalidStructure`] from the remote stages.
pub async fn recognize(bytes: &[u8], config: &OcrConfig) -> Result<String, OcrError> {
    recognize_with_stats(bytes, config).await.map(|o| o.text)
}

/// Like [`recognize`] but also returns the job handle, poll count and timings.
pub async fn recognize_with_stats(
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<RecognitionOutput, OcrError> {
    let transport = resolve_transport(config)?;
    recognize_titled(transport.as_ref(), bytes, UNTITLED, config).await
}

/// Load an image from disk and recognise it.
///
/// The file stem is used as the title in progress events.
pub async fn recognize_file(
    path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<RecognitionOutput, OcrError> {
    let path = path.as_ref();
    let bytes = input::load_image(path, config.max_upload_bytes).await?;
    let transport = resolve_transport(config)?;
    recognize_titled(
        transport.as_ref(),
        &bytes,
        &input::title_from_path(path),
        config,
    )
    .await
}

/// Synchronous wrapper around [`recognize`].
///
/// Creates a temporary tokio runtime internally.
pub fn recognize_sync(bytes: &[u8], config: &OcrConfig) -> Result<String, OcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OcrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(recognize(bytes, config))
}

/// Run the pipeline on an already-resolved transport, reporting progress
/// under `title`.
pub(crate) async fn recognize_titled(
    transport: &dyn Transport,
    bytes: &[u8],
    title: &str,
    config: &OcrConfig,
) -> Result<RecognitionOutput, OcrError> {
    let result = run_stages(transport, bytes, title, config).await;

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(out) => cb.on_complete(title, out.text.len()),
            Err(e) => cb.on_error(title, &e.to_string()),
        }
    }
    result
}

/// The stages alone: no terminal `on_complete` / `on_error` event.
pub(crate) async fn run_stages(
    transport: &dyn Transport,
    bytes: &[u8],
    title: &str,
    config: &OcrConfig,
) -> Result<RecognitionOutput, OcrError> {
    let total_start = Instant::now();

    // ── Step 1: Validate payload ─────────────────────────────────────────
    let mime = input::validate_payload(bytes, config.max_upload_bytes)?;
    info!("Analyzing '{}' ({}, {} bytes)", title, mime, bytes.len());

    // ── Step 2: Submit ───────────────────────────────────────────────────
    let submit_start = Instant::now();
    let handle = submit::submit_document(transport, bytes, config).await?;
    let submit_duration_ms = submit_start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_submitted(title, handle.as_str());
    }

    // ── Step 3: Poll until terminal ──────────────────────────────────────
    let outcome = poll::poll_until_complete(transport, &handle, config, title).await?;
    debug!(
        "'{}' finished after {} polls in {}ms",
        title, outcome.attempts, outcome.elapsed_ms
    );

    // ── Step 4: Extract ──────────────────────────────────────────────────
    let extraction = extract::extract(&outcome.result, &config.delimiter)?;

    let stats = RecognitionStats {
        handle,
        poll_attempts: outcome.attempts,
        paragraphs: extraction.paragraphs,
        skipped_paragraphs: extraction.skipped,
        payload_bytes: bytes.len(),
        submit_duration_ms,
        poll_duration_ms: outcome.elapsed_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Recognised '{}': {} paragraphs, {} chars, {}ms total",
        title,
        stats.paragraphs,
        extraction.text.len(),
        stats.total_duration_ms
    );

    Ok(RecognitionOutput {
        text: extraction.text,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::tests::PNG_MAGIC;
    use crate::pipeline::mock::MockTransport;
    use crate::progress::RecognitionProgressCallback;
    use crate::JobStatus;
    use std::sync::{Arc, Mutex};

    fn config_with(transport: Arc<MockTransport>) -> OcrConfig {
        OcrConfig::builder()
            .endpoint("https://ocr.example.com")
            .api_key("k")
            .poll_interval_ms(1)
            .transport(transport)
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl RecognitionProgressCallback for Events {
        fn on_submitted(&self, title: &str, handle: &str) {
            self.0.lock().unwrap().push(format!("submitted {title} {handle}"));
        }
        fn on_poll(&self, _title: &str, attempt: u32, status: JobStatus) {
            self.0.lock().unwrap().push(format!("poll {attempt} {status:?}"));
        }
        fn on_complete(&self, _title: &str, text_len: usize) {
            self.0.lock().unwrap().push(format!("complete {text_len}"));
        }
        fn on_error(&self, _title: &str, _error: &str) {
            self.0.lock().unwrap().push("error".into());
        }
    }

    #[tokio::test]
    async fn stats_reflect_the_run() {
        let transport = Arc::new(
            MockTransport::new()
                .accept("https://ocr.example.com/op/7")
                .poll_status("running")
                .poll_succeeded(&["Dear diary", "Today"]),
        );
        let out = recognize_with_stats(PNG_MAGIC, &config_with(transport))
            .await
            .unwrap();
        assert_eq!(out.text, "Dear diary\nToday");
        assert_eq!(out.stats.handle.as_str(), "https://ocr.example.com/op/7");
        assert_eq!(out.stats.poll_attempts, 2);
        assert_eq!(out.stats.paragraphs, 2);
        assert_eq!(out.stats.payload_bytes, PNG_MAGIC.len());
    }

    #[tokio::test]
    async fn progress_events_in_order() {
        let transport = Arc::new(
            MockTransport::new()
                .accept("https://x/op/1")
                .poll_status("running")
                .poll_succeeded(&["abc"]),
        );
        let events = Arc::new(Events::default());
        let mut config = config_with(transport);
        config.progress_callback = Some(events.clone());

        recognize(PNG_MAGIC, &config).await.unwrap();
        assert_eq!(
            *events.0.lock().unwrap(),
            vec![
                "submitted document https://x/op/1",
                "poll 1 Running",
                "poll 2 Succeeded",
                "complete 3",
            ]
        );
    }

    #[tokio::test]
    async fn invalid_payload_makes_no_request() {
        let transport = Arc::new(MockTransport::new().accept("https://x/op/1"));
        let events = Arc::new(Events::default());
        let mut config = config_with(transport.clone());
        config.progress_callback = Some(events.clone());

        let err = recognize(b"not an image", &config).await.unwrap_err();
        assert!(matches!(err, OcrError::NotAnImage { .. }));
        assert!(transport.requests().is_empty());
        assert_eq!(*events.0.lock().unwrap(), vec!["error"]);
    }

    #[tokio::test]
    async fn submit_body_carries_base64_payload() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let transport = Arc::new(
            MockTransport::new()
                .accept("https://x/op/1")
                .poll_succeeded(&[]),
        );
        recognize(PNG_MAGIC, &config_with(transport.clone()))
            .await
            .unwrap();

        let requests = transport.requests();
        let submit = &requests[0];
        assert_eq!(submit.method, "POST");
        assert!(submit.url.contains("documentModels/prebuilt-read:analyze"));
        let body = submit.body.as_ref().unwrap();
        assert_eq!(body["base64Source"], STANDARD.encode(PNG_MAGIC));
    }

    #[test]
    fn sync_wrapper_runs_pipeline() {
        let transport = Arc::new(
            MockTransport::new()
                .accept("https://x/op/1")
                .poll_succeeded(&["sync"]),
        );
        assert_eq!(
            recognize_sync(PNG_MAGIC, &config_with(transport)).unwrap(),
            "sync"
        );
    }
}
