//! HTTP client for the transcription server
//!
//! [`StatusSource`] is the seam between the monitor and the network: one call
//! per poll tick, no state kept between calls. [`TranscriptionClient`] is the
//! reqwest-backed implementation, which also submits new jobs.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{StatusReport, StatusResponse, SubmitRequest, SubmitResponse, Submission};
use async_trait::async_trait;
use url::Url;

/// Longest response body kept in an [`Error::Http`]
const MAX_ERROR_BODY_LEN: usize = 512;

/// Source of status reports for a task
///
/// Implementations perform exactly one request per call. Transport failures are
/// returned as errors for the retry policy to classify; a well-formed
/// `success: false` answer is a [`StatusReport::Rejected`], not an error.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of `task_id`
    async fn fetch_status(&self, task_id: &str) -> Result<StatusReport>;
}

/// Client for the transcription server's JSON API
#[derive(Clone, Debug)]
pub struct TranscriptionClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TranscriptionClient {
    /// Build a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_http_client(http, &config.base_url)
    }

    /// Build a client around an existing reqwest client
    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// Base URL all endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the status endpoint for `task_id`
    pub fn task_url(&self, task_id: &str) -> Result<Url> {
        let relative = format!("api/task/{}", urlencoding::encode(task_id));
        Ok(self.base_url.join(&relative)?)
    }

    /// Submit a new transcription job
    ///
    /// Returns [`Submission::AlreadyTranscribed`] when the server already holds a
    /// transcript for the video, so there is nothing to monitor.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<Submission> {
        let url = self.base_url.join("api/transcribe")?;
        tracing::debug!(bv_number = %request.bv_number, %url, "Submitting transcription job");

        let response = self.http.post(url).json(request).send().await?;
        let body: SubmitResponse = read_json_body(response).await?;
        let submission = Submission::try_from(body)?;

        match &submission {
            Submission::Accepted(handle) => {
                tracing::info!(
                    task_id = %handle.task_id,
                    video_id = %handle.video_id,
                    "Transcription job accepted"
                );
            }
            Submission::AlreadyTranscribed { video_id } => {
                tracing::info!(video_id = %video_id, "Video already transcribed");
            }
        }

        Ok(submission)
    }
}

#[async_trait]
impl StatusSource for TranscriptionClient {
    async fn fetch_status(&self, task_id: &str) -> Result<StatusReport> {
        let url = self.task_url(task_id)?;
        let response = self.http.get(url).send().await?;
        let body: StatusResponse = read_json_body(response).await?;
        StatusReport::try_from(body)
    }
}

/// Decode a JSON body regardless of the HTTP status code
///
/// The server reports unknown tasks and bad requests as `4xx` responses with a
/// regular `{"success": false, ...}` body, so the body wins over the status
/// code. Only bodies that cannot be decoded fall back to [`Error::Http`] for
/// non-success codes.
async fn read_json_body<T>(response: reqwest::Response) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    let text = response.text().await?;

    match serde_json::from_str::<T>(&text) {
        Ok(body) => Ok(body),
        Err(e) if status.is_success() => Err(Error::Serialization(e)),
        Err(_) => Err(Error::Http {
            status: status.as_u16(),
            body: truncate(text, MAX_ERROR_BODY_LEN),
        }),
    }
}

fn truncate(mut text: String, max_len: usize) -> String {
    if text.len() > max_len {
        let mut cut = max_len;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
