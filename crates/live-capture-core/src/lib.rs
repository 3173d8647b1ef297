//! Live-capture Core Library
//!
//! Supervises concurrent live-stream capture jobs. Each job probes its stream
//! URL, launches an external fetcher (optionally piped into a segmenter),
//! drains the children's output into logs and tears everything down on stop,
//! delete or unexpected exit.
//!
//! # Example
//!
//! ```no_run
//! use live_capture_core::{CaptureSettings, CoreResult, JobRegistry, JobSpec};
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let registry = JobRegistry::new(CaptureSettings::default());
//!
//!     let id = registry.add(JobSpec::new("example", "https://example.test/live/1", "./record"))?;
//!     registry.start(id).await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!
//!     registry.remove(id).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod job;
mod log_pump;
mod probe;
mod process;
mod registry;
mod settings;

pub use {
    error::{CaptureError, Result as CoreResult},
    job::{
        JobId, JobSpec, JobState, JobSummary, LaunchRequest, LaunchStrategy, Pipeline,
        RecordingJob, SegmentedStrategy, SingleFileStrategy, fetcher_command, segmenter_command,
        strategy_for,
    },
    log_pump::{LineSink, LogPump, MAX_LINE_BYTES, TracingSink},
    probe::{CommandProbe, ProbeOutcome, StreamProbe, spawn_probe},
    process::{CommandSpec, ProcessHandle, ProcessRole, TerminateOutcome},
    registry::JobRegistry,
    settings::{
        CaptureMode, CaptureSettings, DEFAULT_EXTENSION, DEFAULT_FETCHER, DEFAULT_GRACE_PERIOD,
        DEFAULT_JOIN_TIMEOUT, DEFAULT_PROBE_TIMEOUT, DEFAULT_QUALITY, DEFAULT_SEGMENT_TIME,
        DEFAULT_SEGMENTER, DEFAULT_WATCH_INTERVAL, ProbeStrictness, ToolPaths,
    },
};

#[cfg(test)]
mod tests;
