use crate::{
    CaptureError, CaptureMode, CoreResult,
    job::{JobId, JobState},
};

use std::{panic::Location, path::PathBuf};

use chrono::{DateTime, Local};
use error_location::ErrorLocation;
use serde::Serialize;
use uuid::Uuid;

/// Parameters supplied when a job is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Display name, also used as the output sub-directory.
    pub name: String,
    /// Stream URL handed to the fetcher.
    pub url: String,
    /// Root directory under which sessions are written.
    pub output_root: PathBuf,
    /// Mode override; the registry default applies when `None`.
    pub mode: Option<CaptureMode>,
}

impl JobSpec {
    /// Spec using the registry's default mode.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            output_root: output_root.into(),
            mode: None,
        }
    }

    /// Pin this job to `mode`.
    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Reject specs with an empty name, url or output directory.
    #[track_caller]
    pub fn validate(&self) -> CoreResult<()> {
        let reason = if self.name.trim().is_empty() {
            "name must not be empty"
        } else if self.url.trim().is_empty() {
            "url must not be empty"
        } else if self.output_root.as_os_str().is_empty() {
            "output directory must not be empty"
        } else {
            return Ok(());
        };

        Err(CaptureError::InvalidJobSpec {
            reason: reason.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Point-in-time view of a job for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Registry identifier.
    pub id: JobId,
    /// Display name.
    pub name: String,
    /// Stream URL.
    pub url: String,
    /// Output root directory.
    pub output_dir: PathBuf,
    /// Effective capture mode.
    pub mode: CaptureMode,
    /// Current lifecycle state.
    pub state: JobState,
    /// Human-readable status label.
    pub label: &'static str,
    /// When the job was registered.
    pub created_at: DateTime<Local>,
    /// Correlation id of the current or most recent run.
    pub session_id: Option<Uuid>,
    /// Output file or segment pattern of the active run.
    pub output: Option<PathBuf>,
    /// OS process ids of the active run.
    pub pids: Vec<u32>,
    /// Description of the most recent failure.
    pub last_error: Option<String>,
}
