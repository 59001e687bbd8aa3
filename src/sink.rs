//! UI-facing callbacks
//!
//! The monitor never renders anything itself. Hosts implement [`UiSink`] to
//! receive progress, stage text and the terminal outcome, and [`Navigator`] to
//! move to the result view once a job completes.

use crate::types::MonitorEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Receiver of UI updates for one monitored task
pub trait UiSink: Send + Sync {
    /// Displayed progress changed (percentage in [5, 100])
    fn on_progress(&self, percent: f64);

    /// Stage text changed ("<stage>, elapsed <m>m<ss>s")
    fn on_stage_text(&self, text: &str);

    /// The job completed and its video is ready
    fn on_completed(&self, video_id: &str);

    /// The job failed on the server
    fn on_failed(&self, reason: &str);

    /// Monitoring failed (server rejection or lost connectivity)
    fn on_errored(&self, reason: &str);
}

/// Host-side navigation, invoked once when a job completes
pub trait Navigator: Send + Sync {
    /// Move the host application to `path`
    fn navigate(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, path: &str) {
        self(path)
    }
}

/// Navigator for hosts without routing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "Navigation requested but no navigator configured");
    }
}

/// [`UiSink`] that publishes [`MonitorEvent`]s on a broadcast channel
///
/// Useful for hosts that consume events from several places, or forward them
/// over a socket. Events sent while nobody is subscribed are dropped.
///
/// # Example
///
/// ```
/// use bili2text_monitor::sink::{EventSink, UiSink};
/// use bili2text_monitor::MonitorEvent;
///
/// let sink = EventSink::new(16);
/// let mut events = sink.subscribe();
/// sink.on_progress(42.0);
/// assert_eq!(events.try_recv().unwrap(), MonitorEvent::Progress { percent: 42.0 });
/// ```
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventSink {
    /// Create a sink buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    fn emit(&self, event: MonitorEvent) {
        // Err only means there are no subscribers right now
        self.tx.send(event).ok();
    }
}

impl UiSink for EventSink {
    fn on_progress(&self, percent: f64) {
        self.emit(MonitorEvent::Progress { percent });
    }

    fn on_stage_text(&self, text: &str) {
        self.emit(MonitorEvent::StageText {
            text: text.to_string(),
        });
    }

    fn on_completed(&self, video_id: &str) {
        self.emit(MonitorEvent::Completed {
            video_id: video_id.to_string(),
        });
    }

    fn on_failed(&self, reason: &str) {
        self.emit(MonitorEvent::Failed {
            reason: reason.to_string(),
        });
    }

    fn on_errored(&self, reason: &str) {
        self.emit(MonitorEvent::Errored {
            reason: reason.to_string(),
        });
    }
}

/// Sink and navigator wrapper that goes silent once the run is cancelled
///
/// Every callback checks the token first, so a monitor cancelled by a torn-down
/// view cannot reach that view afterwards.
pub(crate) struct GuardedSink {
    sink: Arc<dyn UiSink>,
    navigator: Arc<dyn Navigator>,
    cancel: CancellationToken,
}

impl GuardedSink {
    pub(crate) fn new(
        sink: Arc<dyn UiSink>,
        navigator: Arc<dyn Navigator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            navigator,
            cancel,
        }
    }

    fn live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub(crate) fn progress(&self, percent: f64) {
        if self.live() {
            self.sink.on_progress(percent);
        }
    }

    pub(crate) fn stage_text(&self, text: &str) {
        if self.live() {
            self.sink.on_stage_text(text);
        }
    }

    pub(crate) fn completed(&self, video_id: &str) {
        if self.live() {
            self.sink.on_completed(video_id);
        }
    }

    pub(crate) fn failed(&self, reason: &str) {
        if self.live() {
            self.sink.on_failed(reason);
        }
    }

    pub(crate) fn errored(&self, reason: &str) {
        if self.live() {
            self.sink.on_errored(reason);
        }
    }

    pub(crate) fn navigate(&self, path: &str) {
        if self.live() {
            self.navigator.navigate(path);
        }
    }
}
