//! What a job launches once its stream is available.
//!
//! Both strategies share the job state machine; they only differ in the
//! process pipeline they build inside the session directory.

use crate::{
    CaptureError, CaptureMode, CaptureSettings, CoreResult, LineSink, LogPump, ToolPaths,
    process::{CommandSpec, ProcessHandle, ProcessRole},
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{debug, error, info, instrument, warn};

/// Inputs for launching one recording session.
pub struct LaunchRequest<'a> {
    /// Job display name, used to tag log lines.
    pub job_name: &'a str,
    /// Stream URL.
    pub url: &'a str,
    /// Freshly created directory for this session's output.
    pub session_dir: &'a Path,
    /// Supervisor settings.
    pub settings: &'a CaptureSettings,
    /// Destination for child output.
    pub sink: Arc<dyn LineSink>,
    /// Notified whenever a child's output stream closes.
    pub exit_notify: Arc<Notify>,
}

/// Builds the process pipeline for a job variant.
#[async_trait]
pub trait LaunchStrategy: Send + Sync {
    /// Mode this strategy implements.
    fn mode(&self) -> CaptureMode;

    /// Launch every process of the pipeline.
    ///
    /// On error nothing launched by this call is left running.
    async fn launch(&self, request: LaunchRequest<'_>) -> CoreResult<Pipeline>;
}

/// Strategy implementing `mode`.
pub fn strategy_for(mode: CaptureMode) -> Arc<dyn LaunchStrategy> {
    match mode {
        CaptureMode::Single => Arc::new(SingleFileStrategy),
        CaptureMode::Segment => Arc::new(SegmentedStrategy),
    }
}

/// `<fetcher> <url> <quality> -o <output>`; `output` of `-` writes to stdout.
pub fn fetcher_command(tools: &ToolPaths, url: &str, output: &str) -> CommandSpec {
    CommandSpec::new(&tools.fetcher)
        .arg(url)
        .arg(&tools.quality)
        .arg("-o")
        .arg(output)
}

/// Stream-copy segmenter reading from stdin into numbered files.
pub fn segmenter_command(tools: &ToolPaths, segment_time: Duration, pattern: &Path) -> CommandSpec {
    CommandSpec::new(&tools.segmenter)
        .arg("-i")
        .arg("pipe:0")
        .arg("-c:v")
        .arg("copy")
        .arg("-c:a")
        .arg("copy")
        .arg("-f")
        .arg("segment")
        .arg("-segment_time")
        .arg(segment_time.as_secs().to_string())
        .arg("-segment_start_number")
        .arg("1")
        .arg("-reset_timestamps")
        .arg("1")
        .arg("-y")
        .arg(pattern.to_string_lossy())
}

/// The running processes of one recording session.
pub struct Pipeline {
    fetcher: ProcessHandle,
    segmenter: Option<ProcessHandle>,
    pumps: Vec<JoinHandle<u64>>,
    output: PathBuf,
}

impl Pipeline {
    /// Output file, or segment file pattern.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// OS process ids of every launched process.
    pub fn pids(&self) -> Vec<u32> {
        std::iter::once(&self.fetcher)
            .chain(self.segmenter.as_ref())
            .filter_map(ProcessHandle::pid)
            .collect()
    }

    /// First process found to have exited, if any.
    pub(crate) fn exited(&mut self) -> Option<(ProcessRole, ExitStatus)> {
        if let Some(status) = self.fetcher.exit_status() {
            return Some((ProcessRole::Fetcher, status));
        }
        self.segmenter
            .as_mut()
            .and_then(|segmenter| segmenter.exit_status().map(|s| (ProcessRole::Segmenter, s)))
    }

    /// Terminate every process, then give the log pumps a moment to flush.
    ///
    /// The fetcher goes first so the segmenter sees end-of-stream and can
    /// finish its current segment before its own stop signal. Every process
    /// is attempted even if an earlier one fails; the first error is
    /// returned.
    #[instrument(skip(self), fields(output = ?self.output))]
    pub async fn shutdown(mut self, grace: Duration, join_timeout: Duration) -> CoreResult<()> {
        let mut first_error = None;

        let handles = std::iter::once(&mut self.fetcher).chain(self.segmenter.as_mut());
        for handle in handles {
            match handle.terminate(grace).await {
                Ok(outcome) => debug!(role = %handle.role(), outcome = ?outcome, "Process reaped"),
                Err(e) => {
                    error!(role = %handle.role(), error = %e, "Process termination failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        for mut pump in self.pumps.drain(..) {
            match tokio::time::timeout(join_timeout, &mut pump).await {
                Ok(Ok(lines)) => debug!(lines, "Log pump drained"),
                Ok(Err(e)) => warn!(error = ?e, "Log pump task panicked"),
                Err(_) => {
                    debug!("Log pump did not finish within timeout, aborting");
                    pump.abort();
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// One fetcher writing straight into `record.<ext>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleFileStrategy;

#[async_trait]
impl LaunchStrategy for SingleFileStrategy {
    fn mode(&self) -> CaptureMode {
        CaptureMode::Single
    }

    #[instrument(skip(self, request), fields(job = %request.job_name))]
    async fn launch(&self, request: LaunchRequest<'_>) -> CoreResult<Pipeline> {
        let output = request
            .session_dir
            .join(format!("record.{}", request.settings.extension));
        let spec = fetcher_command(
            &request.settings.tools,
            request.url,
            &output.to_string_lossy(),
        );

        let mut fetcher = ProcessHandle::launch(ProcessRole::Fetcher, &spec, None, Stdio::piped())?;

        let prefix = format!("{}:{}", ProcessRole::Fetcher, request.job_name);
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = fetcher.take_stdout() {
            pumps.push(LogPump::spawn(
                stdout,
                prefix.clone(),
                Arc::clone(&request.sink),
                Some(Arc::clone(&request.exit_notify)),
            ));
        }
        if let Some(stderr) = fetcher.take_stderr() {
            pumps.push(LogPump::spawn(
                stderr,
                prefix,
                Arc::clone(&request.sink),
                Some(Arc::clone(&request.exit_notify)),
            ));
        }

        info!(output = ?output, "Single-file capture launched");

        Ok(Pipeline {
            fetcher,
            segmenter: None,
            pumps,
            output,
        })
    }
}

/// Fetcher piped into a segmenter producing `seg-001.<ext>`, `seg-002.<ext>`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentedStrategy;

impl SegmentedStrategy {
    /// Stop a fetcher whose segmenter never came up.
    async fn abandon(fetcher: &mut ProcessHandle, grace: Duration) {
        if let Err(e) = fetcher.terminate(grace).await {
            error!(error = %e, "Failed to stop fetcher after segmenter launch failure");
        }
    }
}

#[async_trait]
impl LaunchStrategy for SegmentedStrategy {
    fn mode(&self) -> CaptureMode {
        CaptureMode::Segment
    }

    #[instrument(skip(self, request), fields(job = %request.job_name))]
    async fn launch(&self, request: LaunchRequest<'_>) -> CoreResult<Pipeline> {
        let settings = request.settings;
        let pattern = request
            .session_dir
            .join(format!("seg-%03d.{}", settings.extension));

        let fetch_spec = fetcher_command(&settings.tools, request.url, "-");
        let mut fetcher =
            ProcessHandle::launch(ProcessRole::Fetcher, &fetch_spec, None, Stdio::piped())?;

        let Some(stdout) = fetcher.take_stdout() else {
            Self::abandon(&mut fetcher, settings.grace_period).await;
            return Err(CaptureError::PipeWiring {
                reason: "fetcher stdout was not captured".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let segment_input: Stdio = match stdout.try_into() {
            Ok(stdio) => stdio,
            Err(e) => {
                Self::abandon(&mut fetcher, settings.grace_period).await;
                return Err(CaptureError::PipeWiring {
                    reason: format!("cannot hand fetcher stdout to segmenter: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        // The pipe's read end moves into the segmenter command and is closed in
        // this process once the segmenter is spawned, so fetcher exit reaches
        // the segmenter as end-of-stream.
        let segment_spec = segmenter_command(&settings.tools, settings.segment_time, &pattern);
        let mut segmenter = match ProcessHandle::launch(
            ProcessRole::Segmenter,
            &segment_spec,
            Some(segment_input),
            Stdio::null(),
        ) {
            Ok(segmenter) => segmenter,
            Err(e) => {
                Self::abandon(&mut fetcher, settings.grace_period).await;
                return Err(e);
            }
        };

        let mut pumps = Vec::with_capacity(2);
        for handle in [&mut fetcher, &mut segmenter] {
            if let Some(stderr) = handle.take_stderr() {
                pumps.push(LogPump::spawn(
                    stderr,
                    format!("{}:{}", handle.role(), request.job_name),
                    Arc::clone(&request.sink),
                    Some(Arc::clone(&request.exit_notify)),
                ));
            }
        }

        info!(
            pattern = ?pattern,
            segment_secs = settings.segment_time.as_secs(),
            "Segmented capture launched"
        );

        Ok(Pipeline {
            fetcher,
            segmenter: Some(segmenter),
            pumps,
            output: pattern,
        })
    }
}
