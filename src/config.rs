//! Player configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the playback coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Delay before retrying source scanning while decoders are missing
    #[serde(default = "default_scan_retry_ms")]
    pub scan_retry_ms: u64,

    /// Delay before retrying a decoder input feed after the source had no
    /// data but accepted more
    #[serde(default = "default_feed_retry_ms")]
    pub feed_retry_ms: u64,

    /// Interval between duration polls for dynamic-duration sources
    #[serde(default = "default_poll_duration_interval_ms")]
    pub poll_duration_interval_ms: u64,

    /// Buffer count requested when opening the audio sink
    #[serde(default = "default_sink_buffer_count")]
    pub sink_buffer_count: u32,

    /// Minimum content duration for requesting a deep audio buffer on
    /// video-less playback
    #[serde(default = "default_min_deep_buffer_duration_us")]
    pub min_deep_buffer_duration_us: i64,

    /// Video lateness beyond which non-reference AVC frames are dropped
    /// before decode
    #[serde(default = "default_video_late_threshold_us")]
    pub video_late_threshold_us: i64,
}

fn default_scan_retry_ms() -> u64 {
    100
}

fn default_feed_retry_ms() -> u64 {
    10
}

fn default_poll_duration_interval_ms() -> u64 {
    1000
}

fn default_sink_buffer_count() -> u32 {
    8
}

fn default_min_deep_buffer_duration_us() -> i64 {
    5_000_000
}

fn default_video_late_threshold_us() -> i64 {
    100_000
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            scan_retry_ms: default_scan_retry_ms(),
            feed_retry_ms: default_feed_retry_ms(),
            poll_duration_interval_ms: default_poll_duration_interval_ms(),
            sink_buffer_count: default_sink_buffer_count(),
            min_deep_buffer_duration_us: default_min_deep_buffer_duration_us(),
            video_late_threshold_us: default_video_late_threshold_us(),
        }
    }
}

impl PlayerConfig {
    pub fn scan_retry(&self) -> Duration {
        Duration::from_millis(self.scan_retry_ms)
    }

    pub fn feed_retry(&self) -> Duration {
        Duration::from_millis(self.feed_retry_ms)
    }

    pub fn poll_duration_interval(&self) -> Duration {
        Duration::from_millis(self.poll_duration_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.scan_retry_ms, 100);
        assert_eq!(config.feed_retry_ms, 10);
        assert_eq!(config.poll_duration_interval_ms, 1000);
        assert_eq!(config.sink_buffer_count, 8);
        assert_eq!(config.min_deep_buffer_duration_us, 5_000_000);
        assert_eq!(config.video_late_threshold_us, 100_000);
    }

    #[test]
    fn test_interval_accessors() {
        let config = PlayerConfig {
            scan_retry_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.scan_retry(), Duration::from_millis(250));
        assert_eq!(config.feed_retry(), Duration::from_millis(10));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: PlayerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.sink_buffer_count, 8);
        assert_eq!(config.video_late_threshold_us, 100_000);
    }
}
