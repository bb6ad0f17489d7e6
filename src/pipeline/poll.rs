//! Job polling: follow a [`JobHandle`] until the remote job is terminal.
//!
//! ## State machine
//!
//! ```text
//!            ┌──── wait poll_interval ────┐
//!            ▼                            │
//!   ──▶  Running ──── GET handle ─────────┤
//!                                         ├──▶ Succeeded(result)   return Ok
//!                                         └──▶ Failed{message}     return AnalysisFailed
//! ```
//!
//! `Running` is the only state with an outgoing "wait" edge; the loop exits on
//! either terminal state, on the first transport error, or when the poll
//! budget (`poll_timeout_secs`, `max_poll_attempts`) is spent.
//!
//! The delay is fixed rather than exponential: analyze jobs typically finish
//! in a few seconds and the service publishes no `Retry-After` for them.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::submit::JobHandle;
use crate::pipeline::transport::{HttpResponse, Transport};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

/// Status of the remote job as observed by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Map the service's `status` string.
    ///
    /// `notStarted` is queued work and counts as running; `canceled` ends the
    /// job without a result and counts as failed. Unknown values keep the
    /// job running so a new service state never aborts a healthy job.
    pub fn parse(raw: &str) -> JobStatus {
        match raw {
            "succeeded" => JobStatus::Succeeded,
            "failed" | "canceled" | "cancelled" => JobStatus::Failed,
            "running" | "notStarted" => JobStatus::Running,
            other => {
                warn!("Unknown analysis status '{}', treating as running", other);
                JobStatus::Running
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// The JSON document returned by the poll that observed `succeeded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(serde_json::Value);

impl AnalysisResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

/// One step of the poll state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Running,
    Succeeded(AnalysisResult),
    Failed { message: String },
}

impl PollState {
    pub fn status(&self) -> JobStatus {
        match self {
            PollState::Running => JobStatus::Running,
            PollState::Succeeded(_) => JobStatus::Succeeded,
            PollState::Failed { .. } => JobStatus::Failed,
        }
    }

    /// Interpret a poll response.
    pub fn from_response(response: &HttpResponse) -> Result<PollState, OcrError> {
        if !response.is_success() {
            return Err(OcrError::UnexpectedStatus {
                operation: "poll",
                status: response.status,
                body: response.body_text(),
            });
        }

        let body: serde_json::Value =
            serde_json::from_slice(&response.body).map_err(|e| OcrError::InvalidStructure {
                detail: format!("poll response is not JSON: {e}"),
            })?;

        let raw = body
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| OcrError::InvalidStructure {
                detail: "poll response has no 'status' field".into(),
            })?;

        Ok(match JobStatus::parse(raw) {
            JobStatus::Running => PollState::Running,
            JobStatus::Failed => PollState::Failed {
                message: failure_message(&body, raw),
            },
            JobStatus::Succeeded => PollState::Succeeded(AnalysisResult::new(body)),
        })
    }
}

fn failure_message(body: &serde_json::Value, raw_status: &str) -> String {
    let error = body.get("error");
    let code = error.and_then(|e| e.get("code")).and_then(|c| c.as_str());
    let message = error.and_then(|e| e.get("message")).and_then(|m| m.as_str());
    match (code, message) {
        (Some(c), Some(m)) => format!("{c}: {m}"),
        (None, Some(m)) => m.to_string(),
        (Some(c), None) => c.to_string(),
        (None, None) => format!("job ended with status '{raw_status}'"),
    }
}

/// A terminal success plus how long it took to get there.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub result: AnalysisResult,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

/// Poll `handle` until the job succeeds, fails, or the budget runs out.
///
/// `title` is only used for progress events.
pub async fn poll_until_complete(
    transport: &dyn Transport,
    handle: &JobHandle,
    config: &OcrConfig,
    title: &str,
) -> Result<PollOutcome, OcrError> {
    let start = Instant::now();
    let interval = Duration::from_millis(config.poll_interval_ms);
    let deadline = Duration::from_secs(config.poll_timeout_secs);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let response = transport.get(handle.as_str(), &config.api_key).await?;
        let state = PollState::from_response(&response)?;
        debug!("Poll {} of {}: {:?}", attempts, handle, state.status());

        if let Some(ref cb) = config.progress_callback {
            cb.on_poll(title, attempts, state.status());
        }

        match state {
            PollState::Succeeded(result) => {
                return Ok(PollOutcome {
                    result,
                    attempts,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
            PollState::Failed { message } => {
                return Err(OcrError::AnalysisFailed { message });
            }
            PollState::Running => {}
        }

        let elapsed = start.elapsed();
        let out_of_attempts = config.max_poll_attempts.is_some_and(|max| attempts >= max);
        if out_of_attempts || elapsed + interval >= deadline {
            warn!("Giving up on {} after {} polls", handle, attempts);
            return Err(OcrError::TimedOut {
                attempts,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }

        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mock::{analysis_body, MockTransport};
    use serde_json::json;

    fn config() -> OcrConfig {
        OcrConfig::builder()
            .endpoint("https://ocr.example.com")
            .api_key("k")
            .poll_interval_ms(1)
            .build()
            .unwrap()
    }

    fn ok(v: serde_json::Value) -> HttpResponse {
        HttpResponse::new(200).with_json(&v)
    }

    #[test]
    fn status_mapping() {
        assert_eq!(JobStatus::parse("notStarted"), JobStatus::Running);
        assert_eq!(JobStatus::parse("running"), JobStatus::Running);
        assert_eq!(JobStatus::parse("succeeded"), JobStatus::Succeeded);
        assert_eq!(JobStatus::parse("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("canceled"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("somethingNew"), JobStatus::Running);
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn succeeded_keeps_body_unchanged() {
        let body = analysis_body(&["Hello"]);
        let state = PollState::from_response(&ok(body.clone())).unwrap();
        assert_eq!(state, PollState::Succeeded(AnalysisResult::new(body)));
    }

    #[test]
    fn failed_carries_remote_error() {
        let body = json!({"status": "failed", "error": {"code": "InvalidRequest", "message": "Bad image"}});
        let state = PollState::from_response(&ok(body)).unwrap();
        assert_eq!(
            state,
            PollState::Failed {
                message: "InvalidRequest: Bad image".into()
            }
        );
    }

    #[test]
    fn failed_without_error_object() {
        let state = PollState::from_response(&ok(json!({"status": "failed"}))).unwrap();
        assert_eq!(state.status(), JobStatus::Failed);
    }

    #[test]
    fn non_json_body_is_invalid_structure() {
        let r = HttpResponse::new(200).with_body("<html>");
        assert!(matches!(
            PollState::from_response(&r),
            Err(OcrError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn missing_status_is_invalid_structure() {
        let r = ok(json!({"analyzeResult": {}}));
        assert!(matches!(
            PollState::from_response(&r),
            Err(OcrError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn http_error_on_poll_is_unexpected_status() {
        let r = HttpResponse::new(404).with_body("not found");
        match PollState::from_response(&r) {
            Err(OcrError::UnexpectedStatus { operation, status, .. }) => {
                assert_eq!(operation, "poll");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn polls_until_succeeded() {
        let transport = MockTransport::new()
            .poll_status("notStarted")
            .poll_status("running")
            .poll_succeeded(&["a", "b"]);
        let handle = JobHandle::new("https://ocr.example.com/op/1");

        let outcome = poll_until_complete(&transport, &handle, &config(), "t")
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result.as_json(), &analysis_body(&["a", "b"]));
        assert_eq!(transport.poll_count(), 3);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.url == "https://ocr.example.com/op/1" && r.api_key == "k"));
    }

    #[tokio::test]
    async fn failed_status_stops_polling() {
        let transport = MockTransport::new()
            .poll_status("failed")
            .poll_succeeded(&["never"]);
        let handle = JobHandle::new("https://x/op");

        let err = poll_until_complete(&transport, &handle, &config(), "t")
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::AnalysisFailed { .. }));
        assert_eq!(transport.poll_count(), 1);
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let transport = MockTransport::new()
            .poll_status("running")
            .on_poll_error(OcrError::Transport {
                operation: "poll",
                detail: "connection reset".into(),
            })
            .poll_succeeded(&["never"]);
        let handle = JobHandle::new("https://x/op");

        let err = poll_until_complete(&transport, &handle, &config(), "t")
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Transport { .. }));
        assert_eq!(transport.poll_count(), 2);
    }

    #[tokio::test]
    async fn attempt_cap_times_out() {
        let transport = MockTransport::new().poll_status("running");
        let handle = JobHandle::new("https://x/op");
        let mut c = config();
        c.max_poll_attempts = Some(4);

        match poll_until_complete(&transport, &handle, &c, "t").await {
            Err(OcrError::TimedOut { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(transport.poll_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out() {
        let transport = MockTransport::new().poll_status("running");
        let handle = JobHandle::new("https://x/op");
        let c = OcrConfig::builder()
            .endpoint("https://ocr.example.com")
            .api_key("k")
            .poll_interval_ms(2000)
            .poll_timeout_secs(10)
            .build()
            .unwrap();

        match poll_until_complete(&transport, &handle, &c, "t").await {
            // Polls at t = 0, 2, 4, 6, 8; a sixth would land at 10s.
            Err(OcrError::TimedOut { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
