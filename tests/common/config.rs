//! Test configuration with short timings for real-time HTTP tests

use bili2text_monitor::{Config, PollTier};
use std::time::Duration;

/// Configuration pointed at `base_url` with millisecond-scale delays
///
/// Two poll tiers (20ms, then 40ms after three checks), a 20ms retry delay and
/// a 30ms grace delay keep full runs well under a second.
pub fn fast_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.client.base_url = base_url.to_string();
    config.client.request_timeout = Duration::from_secs(2);
    config.poll.tiers = vec![
        PollTier {
            min_checks: 0,
            interval: Duration::from_millis(20),
        },
        PollTier {
            min_checks: 3,
            interval: Duration::from_millis(40),
        },
    ];
    config.retry.retry_delay = Duration::from_millis(20);
    config.terminal.grace_delay = Duration::from_millis(30);
    config.animation.frame_interval = Duration::from_millis(1);
    config
}
