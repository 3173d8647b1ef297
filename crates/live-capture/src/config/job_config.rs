use live_capture_core::CaptureMode;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A job declared in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Display name.
    pub name: String,
    /// Stream URL.
    pub url: String,
    /// Output root; `[capture].output_root` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Mode override; `[capture].mode` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CaptureMode>,
    /// Start the job as soon as it is registered.
    #[serde(default)]
    pub autostart: bool,
}
