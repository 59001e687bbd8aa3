//! Server response fixtures

use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::{Request, Respond, ResponseTemplate};

pub fn processing_body(progress: f64, stage_name: &str, elapsed: f64) -> Value {
    json!({
        "success": true,
        "status": "processing",
        "progress": progress,
        "stage": "transcribing",
        "stage_name": stage_name,
        "elapsed_time": elapsed,
        "video_id": 42
    })
}

pub fn completed_body() -> Value {
    json!({
        "success": true,
        "status": "completed",
        "progress": 1.0,
        "video_id": 42
    })
}

pub fn failed_body() -> Value {
    json!({
        "success": true,
        "status": "failed",
        "message": "Transcription failed: CUDA out of memory",
        "video_id": 42
    })
}

pub fn ok_json(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// HTML error page as served by a reverse proxy
pub fn html_error(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_string("<html><body><h1>Service Unavailable</h1></body></html>")
}

/// Answers with each template in turn, repeating the last one forever
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty(), "at least one response is required");
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.responses[index.min(self.responses.len() - 1)].clone()
    }
}
