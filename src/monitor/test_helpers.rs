//! Scripted status source and recording sinks for monitor tests

use crate::client::StatusSource;
use crate::error::{Error, Result};
use crate::sink::{Navigator, UiSink};
use crate::types::{MonitorEvent, StatusReport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// One scripted answer of [`ScriptedSource`]
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Report(StatusReport),
    /// Transport-level failure (an HTML 503 page)
    Unavailable,
}

/// Status source answering from a fixed script, recording each request time
///
/// Once the script runs out every request fails with a non-retryable error, so
/// an over-polling monitor ends in `errored` instead of hanging.
pub(crate) struct ScriptedSource {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Gaps between consecutive requests
    pub(crate) fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, _task_id: &str) -> Result<StatusReport> {
        self.calls.lock().unwrap().push(Instant::now());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Report(report)) => Ok(report),
            Some(Reply::Unavailable) => Err(Error::Http {
                status: 503,
                body: "<html>Service Unavailable</html>".to_string(),
            }),
            None => Err(Error::Other("script exhausted".to_string())),
        }
    }
}

pub(crate) fn processing(progress: f64) -> Reply {
    Reply::Report(StatusReport::processing(progress))
}

pub(crate) fn staged(progress: f64, stage_name: &str, elapsed_seconds: f64) -> Reply {
    Reply::Report(StatusReport::Processing {
        progress: Some(progress),
        stage_name: Some(stage_name.to_string()),
        stage: Some("transcribing".to_string()),
        elapsed_seconds,
        message: None,
    })
}

pub(crate) fn completed() -> Reply {
    Reply::Report(StatusReport::Completed)
}

pub(crate) fn failed() -> Reply {
    Reply::Report(StatusReport::Failed {
        message: Some("whisper crashed".to_string()),
    })
}

pub(crate) fn rejected(error: Option<&str>) -> Reply {
    Reply::Report(StatusReport::Rejected {
        error: error.map(str::to_string),
    })
}

pub(crate) fn unrecognized(status: Option<&str>) -> Reply {
    Reply::Report(StatusReport::Unrecognized {
        status: status.map(str::to_string),
    })
}

/// Sink recording every callback as a [`MonitorEvent`]
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub(crate) fn progress_values(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MonitorEvent::Progress { percent } => Some(percent),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn stage_texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MonitorEvent::StageText { text } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Completed, failed and errored events in order
    pub(crate) fn terminal_events(&self) -> Vec<MonitorEvent> {
        self.events()
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    MonitorEvent::Progress { .. } | MonitorEvent::StageText { .. }
                )
            })
            .collect()
    }

    fn push(&self, event: MonitorEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl UiSink for RecordingSink {
    fn on_progress(&self, percent: f64) {
        self.push(MonitorEvent::Progress { percent });
    }

    fn on_stage_text(&self, text: &str) {
        self.push(MonitorEvent::StageText {
            text: text.to_string(),
        });
    }

    fn on_completed(&self, video_id: &str) {
        self.push(MonitorEvent::Completed {
            video_id: video_id.to_string(),
        });
    }

    fn on_failed(&self, reason: &str) {
        self.push(MonitorEvent::Failed {
            reason: reason.to_string(),
        });
    }

    fn on_errored(&self, reason: &str) {
        self.push(MonitorEvent::Errored {
            reason: reason.to_string(),
        });
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}
