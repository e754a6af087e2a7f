//! Store configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default buffer length of each subscriber channel.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 42;

/// Default bounded wait for a full subscriber channel.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(1000);

/// Progress assigned to a step that has begun but reported nothing yet.
pub const DEFAULT_START_PROGRESS: f64 = 0.5;

/// Configuration for a progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Buffer length of each subscriber channel
    pub subscriber_capacity: usize,

    /// How long a fanout waits on a full subscriber before dropping the event
    #[serde(with = "crate::duration::millis")]
    pub publish_timeout: Duration,

    /// Progress given to a step by `start` and `set_as_current`
    pub start_progress: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            start_progress: DEFAULT_START_PROGRESS,
        }
    }
}

impl ProgressConfig {
    /// Set the subscriber channel capacity (at least 1).
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Set the publish timeout.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Set the default start progress.
    pub fn with_start_progress(mut self, progress: f64) -> Self {
        self.start_progress = progress;
        self
    }
}
