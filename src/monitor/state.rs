//! Terminal-state machine of one monitor run

use crate::types::StatusReport;

/// Lifecycle phase of a monitor run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Polling; the only non-terminal phase
    Processing,
    /// The job completed
    Completed,
    /// The job failed on the server
    Failed,
    /// Monitoring failed (rejection, unrecognized status or retries exhausted)
    Errored,
}

impl MonitorPhase {
    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        !matches!(self, MonitorPhase::Processing)
    }

    /// Phase after a successfully fetched report
    ///
    /// Terminal phases absorb every report.
    pub fn on_report(self, report: &StatusReport) -> MonitorPhase {
        if self.is_terminal() {
            return self;
        }
        match report {
            StatusReport::Processing { .. } => MonitorPhase::Processing,
            StatusReport::Completed => MonitorPhase::Completed,
            StatusReport::Failed { .. } => MonitorPhase::Failed,
            StatusReport::Rejected { .. } | StatusReport::Unrecognized { .. } => {
                MonitorPhase::Errored
            }
        }
    }

    /// Phase after the retry policy gave up
    pub fn on_retries_exhausted(self) -> MonitorPhase {
        if self.is_terminal() {
            self
        } else {
            MonitorPhase::Errored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_transitions() {
        let p = MonitorPhase::Processing;
        assert_eq!(
            p.on_report(&StatusReport::processing(0.4)),
            MonitorPhase::Processing
        );
        assert_eq!(p.on_report(&StatusReport::Completed), MonitorPhase::Completed);
        assert_eq!(
            p.on_report(&StatusReport::Failed { message: None }),
            MonitorPhase::Failed
        );
        assert_eq!(
            p.on_report(&StatusReport::Rejected { error: None }),
            MonitorPhase::Errored
        );
        assert_eq!(
            p.on_report(&StatusReport::Unrecognized {
                status: Some("downloaded".into())
            }),
            MonitorPhase::Errored
        );
        assert_eq!(p.on_retries_exhausted(), MonitorPhase::Errored);
    }

    #[test]
    fn terminal_phases_absorb_everything() {
        for phase in [
            MonitorPhase::Completed,
            MonitorPhase::Failed,
            MonitorPhase::Errored,
        ] {
            assert!(phase.is_terminal());
            assert_eq!(phase.on_report(&StatusReport::processing(0.9)), phase);
            assert_eq!(phase.on_report(&StatusReport::Completed), phase);
            assert_eq!(phase.on_retries_exhausted(), phase);
        }
        assert!(!MonitorPhase::Processing.is_terminal());
    }
}
