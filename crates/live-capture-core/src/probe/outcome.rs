use crate::CaptureError;

use std::{fmt, panic::Location, path::PathBuf, time::Duration};

use error_location::ErrorLocation;

/// Result of one availability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The stream can be fetched now.
    Available,
    /// The probe ran but the stream is not live.
    Offline {
        /// Exit code of the probe command, if it had one.
        code: Option<i32>,
    },
    /// The probe did not finish in time.
    TimedOut {
        /// Budget that elapsed.
        timeout: Duration,
    },
    /// The probe executable is not installed.
    ExecutableMissing {
        /// Program that was looked up.
        program: PathBuf,
    },
    /// The probe could not be run for another reason.
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

impl ProbeOutcome {
    /// Whether a capture pipeline should be launched.
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeOutcome::Available)
    }

    /// Error describing why `url` was considered unavailable.
    ///
    /// Returns `None` for [`ProbeOutcome::Available`].
    #[track_caller]
    pub fn into_error(self, url: &str) -> Option<CaptureError> {
        let location = ErrorLocation::from(Location::caller());
        match self {
            ProbeOutcome::Available => None,
            ProbeOutcome::TimedOut { timeout } => Some(CaptureError::ProbeTimeout {
                url: url.to_string(),
                timeout,
                location,
            }),
            ProbeOutcome::ExecutableMissing { program } => {
                Some(CaptureError::ProbeExecutableMissing { program, location })
            }
            ProbeOutcome::Offline { code } => Some(CaptureError::StreamUnavailable {
                url: url.to_string(),
                reason: match code {
                    Some(code) => format!("probe exited with code {}", code),
                    None => "probe terminated by signal".to_string(),
                },
                location,
            }),
            ProbeOutcome::Failed { reason } => Some(CaptureError::StreamUnavailable {
                url: url.to_string(),
                reason,
                location,
            }),
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Available => f.write_str("available"),
            ProbeOutcome::Offline { code: Some(code) } => write!(f, "offline (exit code {code})"),
            ProbeOutcome::Offline { code: None } => f.write_str("offline"),
            ProbeOutcome::TimedOut { timeout } => write!(f, "timed out after {timeout:?}"),
            ProbeOutcome::ExecutableMissing { program } => {
                write!(f, "probe executable missing: {}", program.display())
            }
            ProbeOutcome::Failed { reason } => write!(f, "probe failed: {reason}"),
        }
    }
}
