//! Supervisor settings passed explicitly into the registry.
//!
//! Nothing in the core reads process-wide configuration; the binary (or a
//! test) builds a [`CaptureSettings`] and hands it to
//! [`JobRegistry`](crate::JobRegistry).

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Default duration of one output segment.
pub const DEFAULT_SEGMENT_TIME: Duration = Duration::from_secs(1800);

/// Default budget for a stream availability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait between a graceful stop signal and a forced kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Default interval at which an active job checks its children.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Default time teardown waits for background tasks before aborting them.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default fetcher executable.
pub const DEFAULT_FETCHER: &str = "streamlink";

/// Default segmenter executable.
pub const DEFAULT_SEGMENTER: &str = "ffmpeg";

/// Default stream quality requested from the fetcher.
pub const DEFAULT_QUALITY: &str = "best";

/// Default container extension for recorded files.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Output layout produced by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// One continuous file per recording session.
    #[default]
    Single,
    /// Fixed-duration numbered segments per recording session.
    Segment,
}

/// How strictly a probe result is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStrictness {
    /// Available when the probe command completes inside the timeout.
    #[default]
    Lenient,
    /// Available only when the probe command also exits successfully.
    ExitCode,
}

/// External executables and their shared arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Stream fetcher (streamlink-compatible command line).
    pub fetcher: PathBuf,
    /// Segmenter (ffmpeg-compatible command line).
    pub segmenter: PathBuf,
    /// Quality selector passed to the fetcher.
    pub quality: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            fetcher: PathBuf::from(DEFAULT_FETCHER),
            segmenter: PathBuf::from(DEFAULT_SEGMENTER),
            quality: DEFAULT_QUALITY.to_string(),
        }
    }
}

/// Everything the supervisor needs to know to run jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Mode used by jobs that do not choose one themselves.
    pub mode: CaptureMode,
    /// Length of one segment in segmented mode.
    pub segment_time: Duration,
    /// File extension of recorded output, without the dot.
    pub extension: String,
    /// External executables.
    pub tools: ToolPaths,
    /// Budget for a single availability probe.
    pub probe_timeout: Duration,
    /// Interpretation of probe results.
    pub probe_strictness: ProbeStrictness,
    /// Wait between SIGTERM and SIGKILL during teardown.
    pub grace_period: Duration,
    /// Exit watcher polling interval.
    pub watch_interval: Duration,
    /// How long teardown waits for log pumps and probe tasks.
    pub join_timeout: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            segment_time: DEFAULT_SEGMENT_TIME,
            extension: DEFAULT_EXTENSION.to_string(),
            tools: ToolPaths::default(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_strictness: ProbeStrictness::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            watch_interval: DEFAULT_WATCH_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}
