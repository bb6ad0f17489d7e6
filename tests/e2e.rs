//! End-to-end tests against a live Document Intelligence resource.
//!
//! These upload real images from `./test_cases/` and poll real jobs, so they
//! are gated behind `E2E_ENABLED` and the usual credentials:
//!
//!   E2E_ENABLED=1 AZURE_DOCUMENT_ENDPOINT=... AZURE_DOCUMENT_KEY=... \
//!     cargo test --test e2e -- --nocapture

use edgequake_img2txt::{recognize_file, OcrConfig, OcrError};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Skip this test unless E2E_ENABLED is set and credentials are present.
macro_rules! e2e_config_or_skip {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        match OcrConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                println!("SKIP — {e}");
                return;
            }
        }
    }};
}

// ── Live tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_recognise_sample_page() {
    let config = e2e_config_or_skip!();
    let path = test_cases_dir().join("handwritten.jpg");
    if !path.exists() {
        println!("SKIP — test file not found: {}", path.display());
        return;
    }

    let out = recognize_file(&path, &config).await.expect("recognition failed");
    println!("{} polls, {}ms", out.stats.poll_attempts, out.stats.total_duration_ms);
    println!("{}", out.text);

    assert!(!out.text.trim().is_empty(), "no text recognised");
    assert_eq!(out.text, out.text.trim());
    assert!(out.stats.poll_attempts >= 1);
}

#[tokio::test]
async fn test_bad_key_is_rejected() {
    let mut config = e2e_config_or_skip!();
    config.api_key = "not-a-real-key".into();
    let path = test_cases_dir().join("handwritten.jpg");
    if !path.exists() {
        println!("SKIP — test file not found: {}", path.display());
        return;
    }

    let err = recognize_file(&path, &config).await.unwrap_err();
    assert!(
        matches!(err, OcrError::UnexpectedStatus { operation: "submit", status: 401, .. }),
        "unexpected error: {err}"
    );
}
