//! Progress smoothing
//!
//! Status polls arrive every one to three seconds, so showing the reported
//! progress directly makes the bar jump. [`ProgressAnimator`] keeps a displayed
//! value that approaches the last reported target by a fixed fraction of the
//! remaining distance per frame, and snaps once the distance is small.
//!
//! Frames come from a [`FrameScheduler`]. A graphical host would back it with
//! its per-frame callback; [`TimerFrameScheduler`] uses a fixed-rate timer.

use crate::config::AnimationConfig;
use crate::error::Result;
use crate::types::DisplayProgress;
use async_trait::async_trait;
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Sleep, sleep};

/// Result of one animation step
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// The display moved; another frame is needed
    Continue(f64),
    /// The display reached the target; no further frames are needed
    Settled(f64),
}

impl Step {
    /// Displayed percentage after the step
    pub fn percent(&self) -> f64 {
        match self {
            Step::Continue(p) | Step::Settled(p) => *p,
        }
    }
}

/// Exponential approach of displayed progress toward a target
#[derive(Clone, Debug)]
pub struct ProgressAnimator {
    config: AnimationConfig,
    progress: DisplayProgress,
}

impl ProgressAnimator {
    /// Create an animator showing the "job accepted" floor
    ///
    /// Returns [`Error::Config`](crate::error::Error::Config) for settings the
    /// animation cannot run with, such as a floor outside [0, 100).
    pub fn new(config: AnimationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Create an animator from settings already checked by
    /// [`Config::validate`](crate::config::Config::validate)
    pub(crate) fn from_validated(config: AnimationConfig) -> Self {
        let floor = config.floor_percent;
        Self {
            config,
            progress: DisplayProgress {
                current_percent: floor,
                target_percent: floor,
            },
        }
    }

    /// Displayed and target percentages
    pub fn progress(&self) -> DisplayProgress {
        self.progress
    }

    /// Displayed percentage
    pub fn current(&self) -> f64 {
        self.progress.current_percent
    }

    /// Whether the display has reached the target
    pub fn is_settled(&self) -> bool {
        self.progress.current_percent == self.progress.target_percent
    }

    /// Update the target from a reported progress fraction
    ///
    /// The target only moves forward, except that a fraction at or above the
    /// completion threshold is always accepted. Returns whether the target
    /// changed.
    pub fn set_target(&mut self, fraction: f64) -> bool {
        if !fraction.is_finite() {
            return false;
        }

        let target = (fraction * 100.0).clamp(self.config.floor_percent, 100.0);
        let forced = fraction >= self.config.completion_threshold;
        if target > self.progress.target_percent || forced {
            let changed = target != self.progress.target_percent;
            self.progress.target_percent = target;
            changed
        } else {
            false
        }
    }

    /// Force the target to 100%
    pub fn complete(&mut self) -> bool {
        self.set_target(1.0)
    }

    /// Advance the display by one frame
    pub fn step(&mut self) -> Step {
        let DisplayProgress {
            current_percent: current,
            target_percent: target,
        } = self.progress;

        if (target - current).abs() < self.config.snap_threshold {
            self.progress.current_percent = target;
            return Step::Settled(target);
        }

        let next = (current + (target - current) * self.config.smoothing)
            .clamp(self.config.floor_percent, 100.0);
        self.progress.current_percent = next;
        Step::Continue(next)
    }

    /// Jump straight to the target
    ///
    /// Returns the new displayed value if it changed.
    pub fn settle(&mut self) -> Option<f64> {
        if self.is_settled() {
            return None;
        }
        self.progress.current_percent = self.progress.target_percent;
        Some(self.progress.current_percent)
    }
}

/// Cooperative per-frame tick source
///
/// `schedule_next_frame` requests one frame, `next_frame` waits for it, and
/// `cancel` drops a requested frame. `next_frame` never resolves while no frame
/// is scheduled.
#[async_trait]
pub trait FrameScheduler: Send {
    /// Request one more frame
    fn schedule_next_frame(&mut self);

    /// Drop the requested frame, if any
    fn cancel(&mut self);

    /// Whether a frame is requested
    fn is_scheduled(&self) -> bool;

    /// Wait for the requested frame and consume the request
    async fn next_frame(&mut self);
}

/// [`FrameScheduler`] backed by a fixed-rate timer
pub struct TimerFrameScheduler {
    interval: Duration,
    next: Option<Pin<Box<Sleep>>>,
}

impl TimerFrameScheduler {
    /// Create a scheduler that delivers a frame `interval` after each request
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }
}

#[async_trait]
impl FrameScheduler for TimerFrameScheduler {
    fn schedule_next_frame(&mut self) {
        // A frame already requested keeps its deadline
        if self.next.is_none() {
            self.next = Some(Box::pin(sleep(self.interval)));
        }
    }

    fn cancel(&mut self) {
        self.next = None;
    }

    fn is_scheduled(&self) -> bool {
        self.next.is_some()
    }

    async fn next_frame(&mut self) {
        match self.next.as_mut() {
            Some(frame) => {
                frame.as_mut().await;
                self.next = None;
            }
            None => pending::<()>().await,
        }
    }
}
