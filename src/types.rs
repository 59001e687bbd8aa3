//! Core types for bili2text-monitor

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Identifiers of one submitted transcription job
///
/// The task id addresses the server-side job, the video id addresses the
/// resulting video record. Both are opaque to the monitor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Server-side task identifier (e.g. "BV1xx411c7mD_1700000000")
    pub task_id: String,
    /// Identifier of the video the task produces
    pub video_id: String,
}

impl TaskHandle {
    /// Create a new TaskHandle
    pub fn new(task_id: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            video_id: video_id.into(),
        }
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (video {})", self.task_id, self.video_id)
    }
}

/// Task status as reported on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The job is still running
    Processing,
    /// The job finished successfully
    ///
    /// The server answers `transcribed` for finished tasks it only knows from
    /// its video database.
    #[serde(alias = "transcribed")]
    Completed,
    /// The job failed
    Failed,
}

/// Status field as sent by the server
///
/// Values outside [`TaskStatus`] are kept verbatim so they can be reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireStatus {
    /// One of the statuses the monitor acts on
    Known(TaskStatus),
    /// Any other value, e.g. `downloaded` from the server's video database
    Unknown(String),
}

/// Raw body of `GET /api/task/{task_id}`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Whether the server could answer the query
    pub success: bool,
    /// Job status (present when `success` is true)
    #[serde(default)]
    pub status: Option<WireStatus>,
    /// Overall progress fraction in [0, 1]
    #[serde(default)]
    pub progress: Option<f64>,
    /// Machine-readable stage key (downloading, extracting, transcribing, metadata)
    #[serde(default)]
    pub stage: Option<String>,
    /// Human-readable stage label
    #[serde(default)]
    pub stage_name: Option<String>,
    /// Seconds since the job started
    #[serde(default)]
    pub elapsed_time: Option<f64>,
    /// Free-form status message
    #[serde(default)]
    pub message: Option<String>,
    /// Error message (present when `success` is false)
    #[serde(default)]
    pub error: Option<String>,
}

/// One classified status poll
#[derive(Clone, Debug, PartialEq)]
pub enum StatusReport {
    /// The job is still running
    Processing {
        /// Overall progress fraction in [0, 1], if reported
        progress: Option<f64>,
        /// Human-readable stage label, if reported
        stage_name: Option<String>,
        /// Machine-readable stage key, if reported
        stage: Option<String>,
        /// Seconds since the job started
        elapsed_seconds: f64,
        /// Free-form status message
        message: Option<String>,
    },
    /// The job finished successfully
    Completed,
    /// The job failed
    Failed {
        /// Server-side message, if any
        message: Option<String>,
    },
    /// The server answered `success: false`
    Rejected {
        /// Server-side error message, if any
        error: Option<String>,
    },
    /// The server answered `success: true` without a status the monitor knows
    Unrecognized {
        /// Raw status value; `None` when the field was missing
        status: Option<String>,
    },
}

impl StatusReport {
    /// Shorthand for a processing report with a progress value and no stage
    pub fn processing(progress: f64) -> Self {
        StatusReport::Processing {
            progress: Some(progress),
            stage_name: None,
            stage: None,
            elapsed_seconds: 0.0,
            message: None,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            StatusReport::Processing { .. } => "processing",
            StatusReport::Completed => "completed",
            StatusReport::Failed { .. } => "failed",
            StatusReport::Rejected { .. } => "rejected",
            StatusReport::Unrecognized { .. } => "unrecognized",
        }
    }
}

impl TryFrom<StatusResponse> for StatusReport {
    type Error = Error;

    fn try_from(response: StatusResponse) -> Result<Self> {
        if !response.success {
            return Ok(StatusReport::Rejected {
                error: response.error,
            });
        }

        let status = match response.status {
            Some(WireStatus::Known(status)) => status,
            Some(WireStatus::Unknown(raw)) => {
                return Ok(StatusReport::Unrecognized { status: Some(raw) });
            }
            None => return Ok(StatusReport::Unrecognized { status: None }),
        };

        Ok(match status {
            TaskStatus::Processing => StatusReport::Processing {
                progress: response
                    .progress
                    .filter(|p| p.is_finite())
                    .map(|p| p.clamp(0.0, 1.0)),
                stage_name: response.stage_name,
                stage: response.stage,
                elapsed_seconds: response
                    .elapsed_time
                    .filter(|t| t.is_finite() && *t >= 0.0)
                    .unwrap_or(0.0),
                message: response.message,
            },
            TaskStatus::Completed => StatusReport::Completed,
            TaskStatus::Failed => StatusReport::Failed {
                message: response.message.or(response.error),
            },
        })
    }
}

/// Polling bookkeeping owned by the [`PollScheduler`](crate::scheduler::PollScheduler)
#[derive(Clone, Debug, PartialEq)]
pub struct PollState {
    /// Most recent progress fraction in [0, 1]
    pub last_progress: f64,
    /// Number of `processing` polls completed so far; never decreases
    pub check_count: u32,
    /// Current delay between polls; never decreases
    pub check_interval: Duration,
    /// Most recent stage label
    pub current_stage_label: String,
    /// Most recent machine-readable stage key
    pub current_stage: Option<String>,
}

/// Displayed and target progress owned by the
/// [`ProgressAnimator`](crate::animator::ProgressAnimator)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayProgress {
    /// Percentage currently shown, in [floor, 100]
    pub current_percent: f64,
    /// Percentage the display converges toward, in [floor, 100]
    pub target_percent: f64,
}

/// Terminal result of one monitor run, delivered exactly once
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// The job finished and its video is ready
    Completed {
        /// Video produced by the job
        video_id: String,
    },
    /// The job itself failed on the server
    Failed {
        /// Reason shown to the user
        reason: String,
    },
    /// Monitoring failed (server rejection or lost connectivity)
    Errored {
        /// Reason shown to the user
        reason: String,
    },
}

impl MonitorOutcome {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorOutcome::Completed { .. } => "completed",
            MonitorOutcome::Failed { .. } => "failed",
            MonitorOutcome::Errored { .. } => "errored",
        }
    }
}

/// UI-facing event emitted while a task is monitored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Displayed progress changed
    Progress {
        /// Percentage in [5, 100]
        percent: f64,
    },
    /// Stage and elapsed time text changed
    StageText {
        /// Pre-formatted "<stage>, elapsed <m>m<ss>s" text
        text: String,
    },
    /// The job finished
    Completed {
        /// Video produced by the job
        video_id: String,
    },
    /// The job failed
    Failed {
        /// Reason shown to the user
        reason: String,
    },
    /// Monitoring failed
    Errored {
        /// Reason shown to the user
        reason: String,
    },
}

/// Body of `POST /api/transcribe`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Bilibili video id (BV number)
    pub bv_number: String,
    /// Transcription engine; the server default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Model size; the server default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_size: Option<String>,
}

impl SubmitRequest {
    /// Request with server-side engine and model defaults
    pub fn new(bv_number: impl Into<String>) -> Self {
        Self {
            bv_number: bv_number.into(),
            engine: None,
            model_size: None,
        }
    }
}

/// Raw body returned by `POST /api/transcribe`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubmitResponse {
    /// Whether the job was accepted
    pub success: bool,
    /// Task id of the new job
    #[serde(default)]
    pub task_id: Option<String>,
    /// Video record id; the server sends a number
    #[serde(default, deserialize_with = "string_or_number")]
    pub video_id: Option<String>,
    /// Job status; `completed` when the video was already transcribed
    #[serde(default)]
    pub status: Option<WireStatus>,
    /// Informational message
    #[serde(default)]
    pub message: Option<String>,
    /// Error message (present when `success` is false)
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of submitting a transcription job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// A new task was started and can be monitored
    Accepted(TaskHandle),
    /// The video was transcribed earlier; nothing to monitor
    AlreadyTranscribed {
        /// Existing video record
        video_id: String,
    },
}

impl TryFrom<SubmitResponse> for Submission {
    type Error = Error;

    fn try_from(response: SubmitResponse) -> Result<Self> {
        if !response.success {
            return Err(Error::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "submission rejected".to_string()),
            ));
        }

        let video_id = response.video_id.ok_or_else(|| {
            Error::MalformedReport("submission response without a video_id".to_string())
        })?;

        match (response.task_id, response.status) {
            (Some(task_id), _) => Ok(Submission::Accepted(TaskHandle { task_id, video_id })),
            (None, Some(WireStatus::Known(TaskStatus::Completed))) => {
                Ok(Submission::AlreadyTranscribed { video_id })
            }
            (None, _) => Err(Error::MalformedReport(
                "submission response without a task_id".to_string(),
            )),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}
