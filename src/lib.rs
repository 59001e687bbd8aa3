//! # bili2text-monitor
//!
//! Client-side monitoring of long-running transcription jobs.
//!
//! A job is submitted to the transcription server and identified by a task id.
//! The monitor polls the task's status endpoint, shows smoothly animated
//! progress with a stage line, survives transient network failures, and reports
//! exactly one terminal outcome before handing over to the result view.
//!
//! ## Design Philosophy
//!
//! bili2text-monitor is designed to be:
//! - **Configurable** - Polling tiers, retry budget, animation and messages are all settings
//! - **Sensible defaults** - Works out of the box against a local server
//! - **Library-first** - No rendering; hosts implement [`UiSink`] and [`Navigator`]
//! - **Cancel-safe** - Dropping a [`MonitorHandle`] stops polling and silences callbacks
//!
//! ## Quick Start
//!
//! ```no_run
//! use bili2text_monitor::{
//!     Config, EventSink, NoopNavigator, SubmitRequest, Submission, TaskMonitor,
//!     TranscriptionClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = TranscriptionClient::new(&config.client)?;
//!
//!     let task = match client.submit(&SubmitRequest::new("BV1xx411c7mD")).await? {
//!         Submission::Accepted(task) => task,
//!         Submission::AlreadyTranscribed { video_id } => {
//!             println!("already available as video {video_id}");
//!             return Ok(());
//!         }
//!     };
//!
//!     let sink = Arc::new(EventSink::new(256));
//!     let mut events = sink.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let monitor = TaskMonitor::with_source(config, Arc::new(client))?;
//!     let handle = monitor.start(task, sink, Arc::new(NoopNavigator));
//!     println!("Outcome: {:?}", handle.wait().await);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Progress smoothing and frame scheduling
pub mod animator;
/// HTTP client for the transcription server
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Task monitor state machine and run handles
pub mod monitor;
/// Bounded retry policy for transport failures
pub mod retry;
/// Adaptive poll scheduling
pub mod scheduler;
/// UI callbacks and event broadcasting
pub mod sink;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use animator::{FrameScheduler, ProgressAnimator, TimerFrameScheduler};
pub use client::{StatusSource, TranscriptionClient};
pub use config::{
    AnimationConfig, ClientConfig, Config, PollConfig, PollTier, RetryConfig, TerminalConfig,
};
pub use error::{Error, Result};
pub use monitor::{MonitorHandle, MonitorPhase, TaskMonitor};
pub use retry::{IsRetryable, RetryDecision, RetryPolicy};
pub use scheduler::{ArmKind, PollScheduler};
pub use sink::{EventSink, Navigator, NoopNavigator, UiSink};
pub use types::{
    MonitorEvent, MonitorOutcome, StatusReport, SubmitRequest, Submission, TaskHandle, TaskStatus,
};

/// Wait for a monitor run to finish, cancelling it on a termination signal
///
/// Returns the run's outcome, or `None` if a signal arrived first.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use bili2text_monitor::{Config, NoopNavigator, EventSink, TaskHandle, TaskMonitor, run_until_signal};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let monitor = TaskMonitor::new(Config::default())?;
///     let handle = monitor.start(
///         TaskHandle::new("8f14e45f", "42"),
///         Arc::new(EventSink::new(64)),
///         Arc::new(NoopNavigator),
///     );
///
///     // Run with automatic signal handling
///     let outcome = run_until_signal(handle).await;
///     println!("{outcome:?}");
///
///     Ok(())
/// }
/// ```
pub async fn run_until_signal(handle: MonitorHandle) -> Option<MonitorOutcome> {
    let token = handle.cancellation_token();
    tokio::select! {
        outcome = handle.wait() => outcome,
        _ = wait_for_signal() => {
            tracing::info!("Cancelling task monitor on shutdown signal");
            token.cancel();
            None
        }
    }
}

/// Resolve on SIGTERM (unix) or Ctrl+C
///
/// A source that cannot be registered is logged and never resolves, so the
/// other one still works.
async fn wait_for_signal() {
    let terminate = async {
        #[cfg(unix)]
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Could not register SIGTERM handler"),
        }
        std::future::pending::<()>().await
    };
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = terminate => tracing::info!("Received SIGTERM"),
        _ = interrupt => tracing::info!("Received Ctrl+C"),
    }
}
