//! Configuration types for bili2text-monitor

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for [`TaskMonitor`](crate::TaskMonitor)
///
/// Every section and field has a default matching the behavior of the
/// transcription web UI, so `Config::default()` works out of the box against a
/// local server.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Adaptive polling cadence
    #[serde(default)]
    pub poll: PollConfig,

    /// Transport failure handling
    #[serde(default)]
    pub retry: RetryConfig,

    /// Progress smoothing
    #[serde(default)]
    pub animation: AnimationConfig,

    /// Terminal transition behavior (grace delay, navigation, messages)
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Config {
    /// Check the configuration for values the monitor cannot work with
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.client.base_url)
            .map_err(|e| Error::config("client.base_url", e.to_string()))?;

        if self.client.request_timeout.is_zero() {
            return Err(Error::config(
                "client.request_timeout",
                "request timeout must be greater than zero",
            ));
        }

        self.poll.validate()?;
        self.animation.validate()?;

        if !self.terminal.result_path.contains("{video_id}") {
            return Err(Error::config(
                "terminal.result_path",
                "result path must contain the {video_id} placeholder",
            ));
        }

        Ok(())
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the transcription server (default: "http://127.0.0.1:5000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds (default: 30000)
    ///
    /// A request that exceeds this timeout counts as a transport failure.
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// One step of the polling schedule
///
/// A tier applies once `min_checks` status polls have completed, until the next
/// tier takes over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollTier {
    /// Number of completed checks at which this tier starts
    pub min_checks: u32,

    /// Delay between polls while this tier is active, in milliseconds
    #[serde(with = "duration_ms_serde")]
    pub interval: Duration,
}

/// Adaptive polling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Polling tiers, ordered by `min_checks` (default: 1s up to 10 checks,
    /// 2s up to 30 checks, 3s afterwards)
    #[serde(default = "default_poll_tiers")]
    pub tiers: Vec<PollTier>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tiers: default_poll_tiers(),
        }
    }
}

impl PollConfig {
    /// Interval for the given number of completed checks
    pub fn interval_for(&self, check_count: u32) -> Duration {
        self.tiers
            .iter()
            .take_while(|tier| tier.min_checks <= check_count)
            .last()
            .or_else(|| self.tiers.first())
            .map(|tier| tier.interval)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    fn validate(&self) -> Result<()> {
        let Some(first) = self.tiers.first() else {
            return Err(Error::config("poll.tiers", "at least one tier is required"));
        };
        if first.min_checks != 0 {
            return Err(Error::config(
                "poll.tiers",
                "the first tier must start at min_checks = 0",
            ));
        }

        for pair in self.tiers.windows(2) {
            if pair[1].min_checks <= pair[0].min_checks {
                return Err(Error::config(
                    "poll.tiers",
                    "tiers must be sorted by strictly increasing min_checks",
                ));
            }
            // The cadence may only slow down over the lifetime of a monitor
            if pair[1].interval < pair[0].interval {
                return Err(Error::config(
                    "poll.tiers",
                    "tier intervals must be non-decreasing",
                ));
            }
        }

        Ok(())
    }
}

/// Retry configuration for transport failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive transport failures that are retried before giving up
    /// (default: 5, so the 6th consecutive failure is terminal)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay before re-polling after a transport failure, in
    /// milliseconds (default: 3000)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub retry_delay: Duration,

    /// Add random jitter to retry delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            jitter: false,
        }
    }
}

/// Progress animation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Lowest displayed percentage once a job is accepted (default: 5.0)
    #[serde(default = "default_floor_percent")]
    pub floor_percent: f64,

    /// Fraction of the remaining distance covered per frame (default: 0.1)
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,

    /// Distance below which the display snaps to the target (default: 0.5)
    #[serde(default = "default_snap_threshold")]
    pub snap_threshold: f64,

    /// Reported progress at or above which a lower target is still accepted
    /// (default: 0.99)
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold: f64,

    /// Delay between animation frames, in milliseconds (default: 16)
    #[serde(default = "default_frame_interval", with = "duration_ms_serde")]
    pub frame_interval: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            floor_percent: default_floor_percent(),
            smoothing: default_smoothing(),
            snap_threshold: default_snap_threshold(),
            completion_threshold: default_completion_threshold(),
            frame_interval: default_frame_interval(),
        }
    }
}

impl AnimationConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..100.0).contains(&self.floor_percent) {
            return Err(Error::config(
                "animation.floor_percent",
                "floor must be within [0, 100)",
            ));
        }
        if self.smoothing <= 0.0 || !(0.0..=1.0).contains(&self.smoothing) {
            return Err(Error::config(
                "animation.smoothing",
                "smoothing must be within (0, 1]",
            ));
        }
        if self.snap_threshold.is_nan() || self.snap_threshold <= 0.0 {
            return Err(Error::config(
                "animation.snap_threshold",
                "snap threshold must be positive",
            ));
        }
        if self.frame_interval.is_zero() {
            return Err(Error::config(
                "animation.frame_interval",
                "frame interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Terminal transition configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Pause between observing `completed`/`failed` and reporting it, in
    /// milliseconds (default: 1500)
    #[serde(default = "default_grace_delay", with = "duration_ms_serde")]
    pub grace_delay: Duration,

    /// Path handed to the navigator on completion; `{video_id}` is replaced
    /// (default: "/video/{video_id}")
    #[serde(default = "default_result_path")]
    pub result_path: String,

    /// Stage label used when the server sends none (default: "processing")
    #[serde(default = "default_stage_label")]
    pub default_stage_label: String,

    /// Reason reported when the job fails (default: "transcription failed")
    #[serde(default = "default_failed_message")]
    pub failed_message: String,

    /// Reason reported when the server rejects a poll without an error
    /// message (default: "failed to query task status")
    #[serde(default = "default_rejected_message")]
    pub rejected_message: String,

    /// Reason reported when transport retries are exhausted
    /// (default: "lost connection to the server")
    #[serde(default = "default_connection_lost_message")]
    pub connection_lost_message: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            grace_delay: default_grace_delay(),
            result_path: default_result_path(),
            default_stage_label: default_stage_label(),
            failed_message: default_failed_message(),
            rejected_message: default_rejected_message(),
            connection_lost_message: default_connection_lost_message(),
        }
    }
}

impl TerminalConfig {
    /// Navigation path for a finished video
    pub fn result_path_for(&self, video_id: &str) -> String {
        self.result_path.replace("{video_id}", video_id)
    }
}

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_tiers() -> Vec<PollTier> {
    vec![
        PollTier {
            min_checks: 0,
            interval: Duration::from_millis(1000),
        },
        PollTier {
            min_checks: 11,
            interval: Duration::from_millis(2000),
        },
        PollTier {
            min_checks: 31,
            interval: Duration::from_millis(3000),
        },
    ]
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(3000)
}

fn default_floor_percent() -> f64 {
    5.0
}

fn default_smoothing() -> f64 {
    0.1
}

fn default_snap_threshold() -> f64 {
    0.5
}

fn default_completion_threshold() -> f64 {
    0.99
}

fn default_frame_interval() -> Duration {
    Duration::from_millis(16)
}

fn default_grace_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_result_path() -> String {
    "/video/{video_id}".to_string()
}

fn default_stage_label() -> String {
    "processing".to_string()
}

fn default_failed_message() -> String {
    "transcription failed".to_string()
}

fn default_rejected_message() -> String {
    "failed to query task status".to_string()
}

fn default_connection_lost_message() -> String {
    "lost connection to the server".to_string()
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn default_tiers_match_polling_table() {
        let poll = PollConfig::default();
        for count in 0..=10 {
            assert_eq!(poll.interval_for(count), Duration::from_millis(1000));
        }
        for count in 11..=30 {
            assert_eq!(poll.interval_for(count), Duration::from_millis(2000));
        }
        for count in [31, 32, 100, u32::MAX] {
            assert_eq!(poll.interval_for(count), Duration::from_millis(3000));
        }
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.client.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(3000));
        assert!(!config.retry.jitter);
        assert_eq!(config.terminal.grace_delay, Duration::from_millis(1500));
        assert_eq!(config.animation.frame_interval, Duration::from_millis(16));
        assert_eq!(config.poll.tiers.len(), 3);
    }

    #[test]
    fn durations_are_expressed_in_milliseconds() {
        let json = r#"{
            "retry": { "retry_delay": 250 },
            "poll": { "tiers": [ { "min_checks": 0, "interval": 40 } ] }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.retry.retry_delay, Duration::from_millis(250));
        assert_eq!(config.poll.interval_for(99), Duration::from_millis(40));

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["terminal"]["grace_delay"], 1500);
    }

    #[test]
    fn rejects_empty_tiers() {
        let mut config = Config::default();
        config.poll.tiers.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "poll.tiers"));
    }

    #[test]
    fn rejects_first_tier_not_starting_at_zero() {
        let mut config = Config::default();
        config.poll.tiers[0].min_checks = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_decreasing_tier_intervals() {
        let mut config = Config::default();
        config.poll.tiers[2].interval = Duration::from_millis(500);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unsorted_tiers() {
        let mut config = Config::default();
        config.poll.tiers.swap(1, 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_base_url() {
        let mut config = Config::default();
        config.client.base_url = "not a url".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "client.base_url"));
    }

    #[test]
    fn rejects_out_of_range_smoothing() {
        let mut config = Config::default();
        config.animation.smoothing = 0.0;
        assert!(config.validate().is_err());
        config.animation.smoothing = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_frame_interval() {
        let mut config = Config::default();
        config.animation.frame_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn result_path_substitutes_video_id() {
        let terminal = TerminalConfig::default();
        assert_eq!(terminal.result_path_for("42"), "/video/42");
    }

    #[test]
    fn rejects_result_path_without_placeholder() {
        let mut config = Config::default();
        config.terminal.result_path = "/videos".into();
        assert!(config.validate().is_err());
    }
}
