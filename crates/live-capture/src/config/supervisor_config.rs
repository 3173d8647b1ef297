use crate::config::{default_grace_period_secs, default_join_timeout_ms, default_watch_interval_ms};

use serde::{Deserialize, Serialize};

/// Process supervision timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Seconds between SIGTERM and SIGKILL.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
    /// Exit watcher polling interval in milliseconds.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
    /// Milliseconds to wait for background tasks during teardown.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: default_grace_period_secs(),
            watch_interval_ms: default_watch_interval_ms(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}
