use crate::config::{default_extension, default_output_root, default_segment_time};

use live_capture_core::CaptureMode;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Default mode for jobs that do not set their own.
    #[serde(default)]
    pub mode: CaptureMode,
    /// Segment length in seconds.
    #[serde(default = "default_segment_time")]
    pub segment_time: u64,
    /// Container extension without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Output root for jobs that do not set their own.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            segment_time: default_segment_time(),
            extension: default_extension(),
            output_root: default_output_root(),
        }
    }
}
