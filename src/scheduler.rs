//! Adaptive polling cadence
//!
//! [`PollScheduler`] owns the [`PollState`] of one monitor run and the single
//! armed timer that triggers the next status request. The delay between polls
//! grows with the number of completed checks following the configured tiers,
//! and never shrinks during a run.
//!
//! The timer is a cooperative primitive: [`PollScheduler::arm`] stores a
//! deadline and [`PollScheduler::fired`] resolves when it passes. The monitor
//! awaits `fired` alongside its other suspension points.

use crate::config::PollConfig;
use crate::types::PollState;
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Sleep, sleep};

/// Why a timer was armed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmKind {
    /// Regular poll per the interval tiers
    Poll,
    /// Re-poll after a transport failure
    Retry,
}

struct ArmedTimer {
    kind: ArmKind,
    delay: Duration,
    sleep: Pin<Box<Sleep>>,
}

/// Owner of the polling cadence and poll timer
pub struct PollScheduler {
    config: PollConfig,
    state: PollState,
    timer: Option<ArmedTimer>,
}

impl PollScheduler {
    /// Create a scheduler with no checks completed and no timer armed
    pub fn new(config: PollConfig, default_stage_label: impl Into<String>) -> Self {
        let check_interval = config.interval_for(0);
        Self {
            config,
            state: PollState {
                last_progress: 0.0,
                check_count: 0,
                check_interval,
                current_stage_label: default_stage_label.into(),
                current_stage: None,
            },
            timer: None,
        }
    }

    /// Current polling bookkeeping
    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Record a completed `processing` poll and return the next poll interval
    ///
    /// Increments the check count, stores the reported progress and stage, and
    /// recomputes the interval from the updated count.
    pub fn record_check(
        &mut self,
        progress: Option<f64>,
        stage_label: Option<&str>,
        stage: Option<&str>,
    ) -> Duration {
        self.state.check_count = self.state.check_count.saturating_add(1);

        if let Some(progress) = progress.filter(|p| p.is_finite()) {
            self.state.last_progress = progress.clamp(0.0, 1.0);
        }
        if let Some(label) = stage_label {
            self.state.current_stage_label = label.to_string();
        }
        if let Some(stage) = stage {
            self.state.current_stage = Some(stage.to_string());
        }

        let interval = self.config.interval_for(self.state.check_count);
        if interval > self.state.check_interval {
            tracing::debug!(
                check_count = self.state.check_count,
                interval_ms = interval.as_millis(),
                "Polling interval increased"
            );
            self.state.check_interval = interval;
        }
        self.state.check_interval
    }

    /// Schedule exactly one future poll after `delay`
    ///
    /// Any previously armed timer is replaced, so at most one poll is pending.
    pub fn arm(&mut self, delay: Duration, kind: ArmKind) {
        if let Some(previous) = &self.timer {
            tracing::debug!(
                previous = ?previous.kind,
                next = ?kind,
                "Replacing armed poll timer"
            );
        }
        self.timer = Some(ArmedTimer {
            kind,
            delay,
            sleep: Box::pin(sleep(delay)),
        });
    }

    /// Drop the armed timer; no poll fires until the next [`arm`](Self::arm)
    pub fn cancel(&mut self) {
        self.timer = None;
    }

    /// Whether a poll is pending
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Kind and delay of the pending timer
    pub fn armed(&self) -> Option<(ArmKind, Duration)> {
        self.timer.as_ref().map(|t| (t.kind, t.delay))
    }

    /// Wait for the armed timer and disarm it
    ///
    /// Never resolves while nothing is armed.
    pub async fn fired(&mut self) -> ArmKind {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.sleep.as_mut().await;
                let kind = timer.kind;
                self.timer = None;
                kind
            }
            None => pending().await,
        }
    }
}
