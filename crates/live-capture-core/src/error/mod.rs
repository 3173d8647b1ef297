use crate::{job::JobId, process::ProcessRole};

use std::{panic::Location, path::PathBuf, time::Duration};

use error_location::ErrorLocation;
use thiserror::Error;

/// Capture supervision errors with source location tracking.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The executable for a child process could not be found.
    #[error("Executable not found for {role}: {program:?} {location}")]
    ExecutableNotFound {
        /// Which part of the pipeline was being launched.
        role: ProcessRole,
        /// Program that was looked up.
        program: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The executable exists but the OS refused to spawn it.
    #[error("Failed to spawn {role} ({program:?}): {source} {location}")]
    SpawnFailed {
        /// Which part of the pipeline was being launched.
        role: ProcessRole,
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The fetcher output could not be wired into the segmenter.
    #[error("Pipe wiring failed: {reason} {location}")]
    PipeWiring {
        /// Description of the wiring failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Probe did not finish inside its time budget.
    #[error("Probe of {url} timed out after {timeout:?} {location}")]
    ProbeTimeout {
        /// Stream URL that was probed.
        url: String,
        /// Budget that elapsed.
        timeout: Duration,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Probe executable is not installed.
    #[error("Probe executable missing: {program:?} {location}")]
    ProbeExecutableMissing {
        /// Program that was looked up.
        program: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Probe ran but reported no live stream.
    #[error("Stream unavailable at {url}: {reason} {location}")]
    StreamUnavailable {
        /// Stream URL that was probed.
        url: String,
        /// Why the stream was considered offline.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A child could not be stopped, even by force.
    #[error("Failed to terminate {role} (pid {pid:?}): {reason} {location}")]
    TerminationFailed {
        /// Which process failed to stop.
        role: ProcessRole,
        /// OS process id, if still known.
        pid: Option<u32>,
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A child exited while the job still expected it to run.
    #[error("{role} exited unexpectedly: {status} {location}")]
    UnexpectedExit {
        /// Which process exited.
        role: ProcessRole,
        /// Exit status as reported by the OS.
        status: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No job is registered under the given identifier.
    #[error("Unknown job: {id} {location}")]
    UnknownJob {
        /// Identifier that was requested.
        id: JobId,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Job parameters were rejected at registration time.
    #[error("Invalid job spec: {reason} {location}")]
    InvalidJobSpec {
        /// Which field was rejected and why.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Filesystem or OS error.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

// Cannot use #[from] because it does not support extra fields.
impl From<std::io::Error> for CaptureError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CaptureError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`CaptureError`].
pub type Result<T> = std::result::Result<T, CaptureError>;
