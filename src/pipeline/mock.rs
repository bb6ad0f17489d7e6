//! A scripted in-memory [`Transport`] for tests and offline development.
//!
//! Submit and poll responses are queued separately and returned in order.
//! The last queued poll *response* repeats forever, so a single
//! `poll_status("running")` models a job that never finishes. Every request
//! is recorded for later assertions.

use crate::error::OcrError;
use crate::pipeline::submit::{ACCEPTED, OPERATION_LOCATION};
use crate::pipeline::transport::{HttpResponse, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub api_key: String,
    pub body: Option<serde_json::Value>,
}

/// Build a `succeeded` poll body with one paragraph per entry.
pub fn analysis_body(paragraphs: &[&str]) -> serde_json::Value {
    let paragraphs: Vec<serde_json::Value> = paragraphs
        .iter()
        .map(|p| serde_json::json!({ "content": p }))
        .collect();
    serde_json::json!({
        "status": "succeeded",
        "analyzeResult": { "paragraphs": paragraphs }
    })
}

#[derive(Default)]
pub struct MockTransport {
    submits: Mutex<VecDeque<Result<HttpResponse, OcrError>>>,
    polls: Mutex<VecDeque<Result<HttpResponse, OcrError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `202 Accepted` submit response pointing at `location`.
    pub fn accept(self, location: impl Into<String>) -> Self {
        self.on_submit(HttpResponse::new(ACCEPTED).with_header(OPERATION_LOCATION, location))
    }

    pub fn on_submit(self, response: HttpResponse) -> Self {
        lock(&self.submits).push_back(Ok(response));
        self
    }

    pub fn on_submit_error(self, error: OcrError) -> Self {
        lock(&self.submits).push_back(Err(error));
        self
    }

    pub fn on_poll(self, response: HttpResponse) -> Self {
        lock(&self.polls).push_back(Ok(response));
        self
    }

    /// Queue a `200` poll response with only a `status` field.
    pub fn poll_status(self, status: &str) -> Self {
        self.on_poll(HttpResponse::new(200).with_json(&serde_json::json!({ "status": status })))
    }

    /// Queue a `200` poll response that succeeded with `paragraphs`.
    pub fn poll_succeeded(self, paragraphs: &[&str]) -> Self {
        self.on_poll(HttpResponse::new(200).with_json(&analysis_body(paragraphs)))
    }

    pub fn on_poll_error(self, error: OcrError) -> Self {
        lock(&self.polls).push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn submit_count(&self) -> usize {
        self.count("POST")
    }

    pub fn poll_count(&self) -> usize {
        self.count("GET")
    }

    fn count(&self, method: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    fn record(&self, method: &'static str, url: &str, api_key: &str, body: Option<&serde_json::Value>) {
        lock(&self.requests).push(RecordedRequest {
            method,
            url: url.to_string(),
            api_key: api_key.to_string(),
            body: body.cloned(),
        });
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn next(
    queue: &Mutex<VecDeque<Result<HttpResponse, OcrError>>>,
    operation: &str,
    repeat_last: bool,
) -> Result<HttpResponse, OcrError> {
    let mut q = lock(queue);
    if repeat_last && q.len() == 1 {
        if let Some(Ok(last)) = q.front() {
            return Ok(last.clone());
        }
    }
    q.pop_front()
        .unwrap_or_else(|| Err(OcrError::Internal(format!("no scripted {operation} response"))))
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, OcrError> {
        self.record("POST", url, api_key, Some(body));
        next(&self.submits, "submit", false)
    }

    async fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, OcrError> {
        self.record("GET", url, api_key, None);
        next(&self.polls, "poll", true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_poll_response_repeats() {
        let t = MockTransport::new().poll_status("running");
        for _ in 0..3 {
            let r = t.get("u", "k").await.unwrap();
            assert!(r.body_text().contains("running"));
        }
        assert_eq!(t.poll_count(), 3);
    }

    #[tokio::test]
    async fn submits_are_consumed() {
        let t = MockTransport::new().accept("https://x/op/1");
        let body = serde_json::json!({});
        assert_eq!(t.post_json("u", "k", &body).await.unwrap().status, 202);
        assert!(t.post_json("u", "k", &body).await.is_err());
        assert_eq!(t.submit_count(), 2);
    }

    #[test]
    fn analysis_body_shape() {
        let b = analysis_body(&["x"]);
        assert_eq!(b["status"], "succeeded");
        assert_eq!(b["analyzeResult"]["paragraphs"][0]["content"], "x");
    }
}
