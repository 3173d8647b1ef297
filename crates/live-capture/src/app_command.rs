use live_capture_core::JobId;

use std::path::PathBuf;

/// Which jobs a batch command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every registered job.
    All,
    /// One job by identifier.
    One(JobId),
}

/// Commands sent from the console handler to the main application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Register a new idle job.
    AddJob {
        /// Display name.
        name: String,
        /// Stream URL.
        url: String,
        /// Output root; the configured default when absent.
        output_dir: Option<PathBuf>,
    },
    /// Start the selected jobs.
    StartJobs(Selection),
    /// Stop the selected jobs.
    StopJobs(Selection),
    /// Stop and remove one job.
    DeleteJob(JobId),
    /// Print every job.
    ListJobs,
    /// Print the command reference.
    Help,
    /// Request application shutdown.
    Shutdown,
}
