use crate::config::{default_fetcher, default_quality, default_segmenter};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// External executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// streamlink-compatible fetcher.
    #[serde(default = "default_fetcher")]
    pub fetcher: PathBuf,
    /// ffmpeg-compatible segmenter.
    #[serde(default = "default_segmenter")]
    pub segmenter: PathBuf,
    /// Quality selector passed to the fetcher.
    #[serde(default = "default_quality")]
    pub quality: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fetcher: default_fetcher(),
            segmenter: default_segmenter(),
            quality: default_quality(),
        }
    }
}
