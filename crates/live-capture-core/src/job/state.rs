use std::fmt;

use serde::Serialize;

/// Identifier of a job, unique for the lifetime of its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        JobId(value)
    }
}

/// Lifecycle state of a recording job.
///
/// ```text
/// Idle -> Probing -> Active -> Idle      (stop)
///         Probing -> Failed              (stream unavailable)
///                    Active -> Failed    (launch error or unexpected exit)
/// Failed -> Idle                         (stop acknowledges the failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Nothing running.
    #[default]
    Idle,
    /// Waiting for the availability probe.
    Probing,
    /// Capture processes are running.
    Active,
    /// The last attempt failed; see the job's last error.
    Failed,
}

impl JobState {
    /// Human-readable status label for listings.
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Idle => "Idle",
            JobState::Probing => "Probing",
            JobState::Active => "Recording",
            JobState::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
