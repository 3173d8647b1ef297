//! Registry of jobs keyed by identifier.
//!
//! The map lock is only taken to add, look up or remove; per-job operations
//! run on the job's own lock, so a slow stop on one job never delays another.

use crate::{
    CaptureError, CaptureSettings, CommandProbe, CoreResult, LineSink, TracingSink,
    job::{JobId, JobSpec, JobState, JobSummary, RecordingJob, strategy_for},
    probe::StreamProbe,
};

use std::{
    collections::BTreeMap,
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use error_location::ErrorLocation;
use tracing::{info, instrument, warn};

/// Process-wide mapping from [`JobId`] to [`RecordingJob`].
///
/// Identifiers start at 1 and are never reused, even after removal. Jobs
/// iterate in insertion order.
pub struct JobRegistry {
    settings: Arc<CaptureSettings>,
    probe: Arc<dyn StreamProbe>,
    sink: Arc<dyn LineSink>,
    last_id: AtomicU64,
    jobs: Mutex<BTreeMap<JobId, Arc<RecordingJob>>>,
}

impl JobRegistry {
    /// Registry probing with the configured fetcher and logging through `tracing`.
    pub fn new(settings: CaptureSettings) -> Self {
        let probe = Arc::new(CommandProbe::new(
            settings.tools.fetcher.clone(),
            settings.probe_strictness,
        ));
        Self::with_collaborators(settings, probe, Arc::new(TracingSink))
    }

    /// Registry with an explicit probe and log sink.
    pub fn with_collaborators(
        settings: CaptureSettings,
        probe: Arc<dyn StreamProbe>,
        sink: Arc<dyn LineSink>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            probe,
            sink,
            last_id: AtomicU64::new(0),
            jobs: Mutex::new(BTreeMap::new()),
        }
    }

    /// Settings shared by every job.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Register an idle job and return its new identifier.
    ///
    /// # Errors
    ///
    /// [`CaptureError::InvalidJobSpec`] when name, url or output directory is empty.
    #[track_caller]
    #[instrument(skip(self), fields(job = %spec.name))]
    pub fn add(&self, spec: JobSpec) -> CoreResult<JobId> {
        spec.validate()?;

        let id = JobId(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mode = spec.mode.unwrap_or(self.settings.mode);
        let job = Arc::new(RecordingJob::new(
            id,
            spec,
            Arc::clone(&self.settings),
            strategy_for(mode),
            Arc::clone(&self.probe),
            Arc::clone(&self.sink),
        ));

        self.jobs().insert(id, job);
        info!(job_id = %id, mode = ?mode, "Job added");

        Ok(id)
    }

    /// Job registered under `id`.
    pub fn get(&self, id: JobId) -> Option<Arc<RecordingJob>> {
        self.jobs().get(&id).cloned()
    }

    /// Every job in insertion order.
    pub fn list(&self) -> Vec<Arc<RecordingJob>> {
        self.jobs().values().cloned().collect()
    }

    /// Every identifier in insertion order.
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs().keys().copied().collect()
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    /// Whether no job is registered.
    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Snapshots of every job in insertion order.
    ///
    /// Never waits on a job that is busy stopping.
    pub fn list_jobs(&self) -> Vec<JobSummary> {
        self.list().iter().map(|job| job.summary()).collect()
    }

    /// Start the job registered under `id`.
    pub async fn start(&self, id: JobId) -> CoreResult<JobState> {
        let job = self.require(id)?;
        Ok(job.start().await)
    }

    /// Stop the job registered under `id`.
    pub async fn stop(&self, id: JobId) -> CoreResult<JobState> {
        let job = self.require(id)?;
        Ok(job.stop().await)
    }

    /// Stop the job registered under `id`, then remove it.
    ///
    /// The job is removed only after its processes are reaped.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: JobId) -> CoreResult<JobSummary> {
        let job = self.require(id)?;

        let state = job.shutdown().await;
        let summary = job.summary();

        self.jobs().remove(&id);
        info!(job_id = %id, final_state = %state, "Job removed");

        Ok(summary)
    }

    /// Start each listed job; one failure does not stop the rest.
    pub async fn start_all(&self, ids: &[JobId]) -> Vec<(JobId, CoreResult<JobState>)> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            let result = self.start(id).await;
            if let Err(e) = &result {
                warn!(job_id = %id, error = %e, "Start failed");
            }
            results.push((id, result));
        }
        results
    }

    /// Stop each listed job; one failure does not stop the rest.
    pub async fn stop_all(&self, ids: &[JobId]) -> Vec<(JobId, CoreResult<JobState>)> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            let result = self.stop(id).await;
            if let Err(e) = &result {
                warn!(job_id = %id, error = %e, "Stop failed");
            }
            results.push((id, result));
        }
        results
    }

    /// Stop and remove every job.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let ids = self.ids();
        info!(jobs = ids.len(), "Shutting down all jobs");

        for id in ids {
            if let Err(e) = self.remove(id).await {
                warn!(job_id = %id, error = %e, "Failed to remove job during shutdown");
            }
        }
    }

    #[track_caller]
    fn require(&self, id: JobId) -> CoreResult<Arc<RecordingJob>> {
        self.get(id).ok_or_else(|| CaptureError::UnknownJob {
            id,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn jobs(&self) -> MutexGuard<'_, BTreeMap<JobId, Arc<RecordingJob>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
