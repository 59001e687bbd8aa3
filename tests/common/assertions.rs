//! Recording sinks and outcome helpers

use bili2text_monitor::{MonitorEvent, MonitorHandle, MonitorOutcome, Navigator};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

/// Navigator that remembers every requested path
#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

/// Wait for a monitor run to end, panicking after `timeout`
pub async fn wait_for_outcome(handle: MonitorHandle, timeout: Duration) -> Option<MonitorOutcome> {
    tokio::time::timeout(timeout, handle.wait())
        .await
        .expect("monitor did not finish in time")
}

/// Drain every event still buffered on `events`, skipping over lag
pub fn drain_events(events: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut out = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => out.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return out,
        }
    }
}

/// Completed, failed and errored events in order
pub fn terminal_events(events: &[MonitorEvent]) -> Vec<MonitorEvent> {
    events
        .iter()
        .filter(|e| {
            !matches!(
                e,
                MonitorEvent::Progress { .. } | MonitorEvent::StageText { .. }
            )
        })
        .cloned()
        .collect()
}
