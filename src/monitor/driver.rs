//! Event loop of one monitor run
//!
//! The driver owns every piece of mutable state of a run and multiplexes its
//! suspension points on a single task:
//! - the in-flight status request
//! - the armed poll/retry timer
//! - the animation frame timer
//! - the terminal grace delay
//! - the cancellation token
//!
//! Nothing is shared across tasks, so no locking is needed.

use super::state::MonitorPhase;
use crate::animator::{FrameScheduler, ProgressAnimator, Step};
use crate::client::StatusSource;
use crate::config::Config;
use crate::error::Result;
use crate::retry::{IsRetryable, RetryDecision, RetryPolicy};
use crate::scheduler::{ArmKind, PollScheduler};
use crate::sink::GuardedSink;
use crate::types::{MonitorOutcome, StatusReport, TaskHandle};
use crate::utils::format_stage_text;
use futures::future::BoxFuture;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Sleep, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type InFlight = BoxFuture<'static, Result<StatusReport>>;

pub(crate) struct MonitorDriver {
    task: TaskHandle,
    config: Arc<Config>,
    source: Arc<dyn StatusSource>,
    scheduler: PollScheduler,
    retry: RetryPolicy,
    animator: ProgressAnimator,
    frames: Box<dyn FrameScheduler>,
    sink: GuardedSink,
    cancel: CancellationToken,
    phase: MonitorPhase,
    in_flight: Option<InFlight>,
    grace: Option<Pin<Box<Sleep>>>,
    outcome: Option<MonitorOutcome>,
    delivered: bool,
}

impl MonitorDriver {
    pub(crate) fn new(
        task: TaskHandle,
        config: Arc<Config>,
        source: Arc<dyn StatusSource>,
        frames: Box<dyn FrameScheduler>,
        sink: GuardedSink,
        cancel: CancellationToken,
    ) -> Self {
        let scheduler = PollScheduler::new(
            config.poll.clone(),
            config.terminal.default_stage_label.clone(),
        );
        let retry = RetryPolicy::new(config.retry.clone());
        let animator = ProgressAnimator::from_validated(config.animation.clone());

        Self {
            task,
            config,
            source,
            scheduler,
            retry,
            animator,
            frames,
            sink,
            cancel,
            phase: MonitorPhase::Processing,
            in_flight: None,
            grace: None,
            outcome: None,
            delivered: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> MonitorPhase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    #[cfg(test)]
    pub(crate) fn frames_scheduled(&self) -> bool {
        self.frames.is_scheduled()
    }

    /// Drive the run until it delivers an outcome or is cancelled
    pub(crate) async fn run(mut self) -> Option<MonitorOutcome> {
        info!(
            task_id = %self.task.task_id,
            video_id = %self.task.video_id,
            "Task monitor started"
        );

        self.sink.progress(self.animator.current());
        self.scheduler.arm(Duration::ZERO, ArmKind::Poll);

        loop {
            if self.outcome.is_some() && self.grace.is_none() {
                return self.deliver();
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.shutdown();
                    info!(task_id = %self.task.task_id, "Task monitor cancelled");
                    return None;
                }
                _ = wait_grace(&mut self.grace), if self.grace.is_some() => {
                    self.grace = None;
                }
                result = wait_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    self.handle_poll_result(result);
                }
                kind = self.scheduler.fired(), if self.scheduler.is_armed() => {
                    self.issue_poll(kind);
                }
                _ = self.frames.next_frame(), if self.frames.is_scheduled() => {
                    self.on_frame();
                }
            }
        }
    }

    fn issue_poll(&mut self, kind: ArmKind) {
        if self.phase.is_terminal() || self.cancel.is_cancelled() {
            return;
        }
        if self.in_flight.is_some() {
            warn!(task_id = %self.task.task_id, "Poll timer fired while a request is in flight");
            return;
        }

        debug!(
            task_id = %self.task.task_id,
            check_count = self.scheduler.state().check_count,
            retry = kind == ArmKind::Retry,
            "Polling task status"
        );

        let source = Arc::clone(&self.source);
        let task_id = self.task.task_id.clone();
        self.in_flight = Some(Box::pin(async move { source.fetch_status(&task_id).await }));
    }

    /// Apply one poll result to the state machine
    ///
    /// Results arriving after a terminal state or after cancellation are
    /// dropped without side effects.
    pub(crate) fn handle_poll_result(&mut self, result: Result<StatusReport>) {
        if self.phase.is_terminal() || self.cancel.is_cancelled() {
            debug!(
                task_id = %self.task.task_id,
                phase = ?self.phase,
                "Dropping poll result after monitor stopped"
            );
            return;
        }

        match result {
            Ok(report) => {
                self.retry.record_success();
                self.apply_report(report);
            }
            Err(error) => match self.retry.record_failure(&error) {
                RetryDecision::RetryAfter(delay) => {
                    self.scheduler.arm(delay, ArmKind::Retry);
                }
                RetryDecision::GiveUp => {
                    let reason = if error.is_retryable() {
                        self.config.terminal.connection_lost_message.clone()
                    } else {
                        error.to_string()
                    };
                    let phase = self.phase.on_retries_exhausted();
                    self.enter_terminal(phase, MonitorOutcome::Errored { reason }, false);
                }
            },
        }
    }

    fn apply_report(&mut self, report: StatusReport) {
        let next_phase = self.phase.on_report(&report);

        match report {
            StatusReport::Processing {
                progress,
                stage_name,
                stage,
                elapsed_seconds,
                message,
            } => {
                let label = stage_name
                    .as_deref()
                    .unwrap_or(&self.config.terminal.default_stage_label)
                    .to_string();
                let interval = self
                    .scheduler
                    .record_check(progress, Some(&label), stage.as_deref());

                self.sink
                    .stage_text(&format_stage_text(&label, elapsed_seconds));

                if let Some(progress) = progress
                    && self.animator.set_target(progress)
                {
                    self.frames.schedule_next_frame();
                }

                debug!(
                    task_id = %self.task.task_id,
                    check_count = self.scheduler.state().check_count,
                    progress = ?progress,
                    stage = ?stage,
                    message = ?message,
                    next_poll_ms = interval.as_millis(),
                    "Task still processing"
                );

                self.scheduler.arm(interval, ArmKind::Poll);
            }
            StatusReport::Completed => {
                if self.animator.complete() {
                    self.frames.schedule_next_frame();
                }
                let outcome = MonitorOutcome::Completed {
                    video_id: self.task.video_id.clone(),
                };
                self.enter_terminal(next_phase, outcome, true);
            }
            StatusReport::Failed { message } => {
                if let Some(message) = &message {
                    debug!(task_id = %self.task.task_id, message, "Server reported job failure");
                }
                let outcome = MonitorOutcome::Failed {
                    reason: self.config.terminal.failed_message.clone(),
                };
                self.enter_terminal(next_phase, outcome, true);
            }
            StatusReport::Rejected { error } => {
                let reason = error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| self.config.terminal.rejected_message.clone());
                self.enter_terminal(next_phase, MonitorOutcome::Errored { reason }, false);
            }
            StatusReport::Unrecognized { status } => {
                let reason = match status {
                    Some(status) => format!("unexpected task status \"{status}\""),
                    None => "server reply did not include a task status".to_string(),
                };
                warn!(task_id = %self.task.task_id, reason = %reason, "Unrecognized task status");
                self.enter_terminal(next_phase, MonitorOutcome::Errored { reason }, false);
            }
        }
    }

    fn enter_terminal(&mut self, phase: MonitorPhase, outcome: MonitorOutcome, grace: bool) {
        self.phase = phase;
        self.scheduler.cancel();
        self.in_flight = None;

        info!(
            task_id = %self.task.task_id,
            outcome = outcome.kind(),
            checks = self.scheduler.state().check_count,
            "Task reached terminal state"
        );

        let delay = self.config.terminal.grace_delay;
        if grace && !delay.is_zero() {
            self.grace = Some(Box::pin(sleep(delay)));
        }
        self.outcome = Some(outcome);
    }

    fn on_frame(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        match self.animator.step() {
            Step::Continue(percent) => {
                self.sink.progress(percent);
                self.frames.schedule_next_frame();
            }
            Step::Settled(percent) => self.sink.progress(percent),
        }
    }

    /// Report the decided outcome; at most once per run
    pub(crate) fn deliver(&mut self) -> Option<MonitorOutcome> {
        if self.delivered {
            return None;
        }
        let outcome = self.outcome.take()?;
        self.delivered = true;
        self.grace = None;
        self.frames.cancel();

        if self.cancel.is_cancelled() {
            return None;
        }

        match &outcome {
            MonitorOutcome::Completed { video_id } => {
                if let Some(percent) = self.animator.settle() {
                    self.sink.progress(percent);
                }
                self.sink.completed(video_id);
                self.sink
                    .navigate(&self.config.terminal.result_path_for(video_id));
            }
            MonitorOutcome::Failed { reason } => self.sink.failed(reason),
            MonitorOutcome::Errored { reason } => self.sink.errored(reason),
        }

        info!(
            task_id = %self.task.task_id,
            outcome = outcome.kind(),
            "Task monitor finished"
        );
        Some(outcome)
    }

    fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.frames.cancel();
        self.in_flight = None;
        self.grace = None;
    }
}

async fn wait_grace(grace: &mut Option<Pin<Box<Sleep>>>) {
    match grace.as_mut() {
        Some(delay) => delay.as_mut().await,
        None => pending().await,
    }
}

async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> Result<StatusReport> {
    match in_flight.as_mut() {
        Some(request) => request.await,
        None => pending().await,
    }
}
