mod layout;
mod recording_job;
mod spec;
mod state;
mod strategy;

pub(crate) use layout::create_session_dir;

pub use {
    recording_job::RecordingJob,
    spec::{JobSpec, JobSummary},
    state::{JobId, JobState},
    strategy::{
        LaunchRequest, LaunchStrategy, Pipeline, SegmentedStrategy, SingleFileStrategy,
        fetcher_command, segmenter_command, strategy_for,
    },
};
