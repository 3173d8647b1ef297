use crate::config::default_probe_timeout_secs;

use live_capture_core::ProbeStrictness;

use serde::{Deserialize, Serialize};

/// Stream availability probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe budget in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
    /// Whether a non-zero probe exit counts as offline.
    #[serde(default)]
    pub strictness: ProbeStrictness,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout_secs(),
            strictness: ProbeStrictness::default(),
        }
    }
}
