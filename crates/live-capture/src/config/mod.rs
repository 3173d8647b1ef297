mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod job_config;
mod probe_config;
mod supervisor_config;
mod tools_config;

pub(crate) use {
    capture_config::CaptureConfig, config::Config, job_config::JobConfig,
    probe_config::ProbeConfig, supervisor_config::SupervisorConfig, tools_config::ToolsConfig,
};

use live_capture_core::{
    DEFAULT_EXTENSION, DEFAULT_FETCHER, DEFAULT_GRACE_PERIOD, DEFAULT_JOIN_TIMEOUT,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_QUALITY, DEFAULT_SEGMENT_TIME, DEFAULT_SEGMENTER,
    DEFAULT_WATCH_INTERVAL,
};

use std::path::PathBuf;

pub(crate) const DEFAULT_OUTPUT_ROOT: &str = "./record";

pub(crate) fn default_segment_time() -> u64 {
    DEFAULT_SEGMENT_TIME.as_secs()
}

pub(crate) fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

pub(crate) fn default_output_root() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_ROOT)
}

pub(crate) fn default_fetcher() -> PathBuf {
    PathBuf::from(DEFAULT_FETCHER)
}

pub(crate) fn default_segmenter() -> PathBuf {
    PathBuf::from(DEFAULT_SEGMENTER)
}

pub(crate) fn default_quality() -> String {
    DEFAULT_QUALITY.to_string()
}

pub(crate) fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_secs()
}

pub(crate) fn default_grace_period_secs() -> u64 {
    DEFAULT_GRACE_PERIOD.as_secs()
}

pub(crate) fn default_watch_interval_ms() -> u64 {
    DEFAULT_WATCH_INTERVAL.as_millis() as u64
}

pub(crate) fn default_join_timeout_ms() -> u64 {
    DEFAULT_JOIN_TIMEOUT.as_millis() as u64
}
