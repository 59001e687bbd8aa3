//! Task monitor
//!
//! [`TaskMonitor`] wires a [`StatusSource`], the poll and retry timers, the
//! progress animator and the host's [`UiSink`] together. Each call to
//! [`TaskMonitor::start`] spawns one independent run and returns a
//! [`MonitorHandle`] that owns it.
//!
//! A run polls until the job reaches a terminal state, then reports exactly
//! one outcome:
//! - `completed`: progress is shown at 100%, [`UiSink::on_completed`] fires
//!   and the [`Navigator`] moves to the result view
//! - `failed`: [`UiSink::on_failed`] fires after the grace delay
//! - `errored`: [`UiSink::on_errored`] fires immediately
//!
//! Cancelling the handle, or dropping it, stops the run. After cancellation
//! the sink and navigator are never called again.

mod driver;
mod state;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

pub use state::MonitorPhase;

use crate::animator::{FrameScheduler, TimerFrameScheduler};
use crate::client::{StatusSource, TranscriptionClient};
use crate::config::Config;
use crate::error::Result;
use crate::sink::{GuardedSink, Navigator, UiSink};
use crate::types::{MonitorOutcome, TaskHandle};
use driver::MonitorDriver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Factory for monitor runs sharing one configuration and status source
#[derive(Clone)]
pub struct TaskMonitor {
    config: Arc<Config>,
    source: Arc<dyn StatusSource>,
}

impl TaskMonitor {
    /// Validate `config` and build a monitor polling the configured server
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = TranscriptionClient::new(&config.client)?;
        Ok(Self {
            config: Arc::new(config),
            source: Arc::new(client),
        })
    }

    /// Validate `config` and build a monitor polling `source`
    pub fn with_source(config: Config, source: Arc<dyn StatusSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            source,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start monitoring `task`, animating with a fixed-rate frame timer
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &self,
        task: TaskHandle,
        sink: Arc<dyn UiSink>,
        navigator: Arc<dyn Navigator>,
    ) -> MonitorHandle {
        let frames = TimerFrameScheduler::new(self.config.animation.frame_interval);
        self.start_with_frames(task, sink, navigator, Box::new(frames))
    }

    /// Start monitoring `task` with a host-provided frame source
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_with_frames(
        &self,
        task: TaskHandle,
        sink: Arc<dyn UiSink>,
        navigator: Arc<dyn Navigator>,
        frames: Box<dyn FrameScheduler>,
    ) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let driver = MonitorDriver::new(
            task.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.source),
            frames,
            GuardedSink::new(sink, navigator, cancel.clone()),
            cancel.clone(),
        );

        let join = tokio::spawn(driver.run());

        MonitorHandle {
            task,
            cancel: cancel.clone(),
            join,
            _guard: cancel.drop_guard(),
        }
    }
}

impl std::fmt::Debug for TaskMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Owner of one monitor run
///
/// Dropping the handle cancels the run.
#[derive(Debug)]
pub struct MonitorHandle {
    task: TaskHandle,
    cancel: CancellationToken,
    join: JoinHandle<Option<MonitorOutcome>>,
    _guard: DropGuard,
}

impl MonitorHandle {
    /// Task being monitored
    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    /// Stop the run
    ///
    /// Pending timers are dropped and no callback fires afterwards. Calling
    /// this more than once, or after the run finished, has no effect.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called or the handle's token fired
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the run has stopped
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to end
    ///
    /// Returns the delivered outcome, or `None` if the run was cancelled
    /// before delivering one.
    pub async fn wait(self) -> Option<MonitorOutcome> {
        let MonitorHandle { task, join, .. } = self;
        match join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(task_id = %task.task_id, error = %e, "Task monitor aborted");
                None
            }
        }
    }
}
