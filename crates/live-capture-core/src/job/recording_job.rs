//! Per-job recording state machine.
//!
//! Every transition happens under the job's own mutex, so concurrent
//! `start`/`stop` calls on one job serialize while different jobs never
//! contend. Background work (probe task, exit watcher, log pumps) is owned by
//! the job and joined or aborted during teardown.
//!
//! # Stop during probing
//!
//! `stop` bumps the job's generation. A probe result carrying an older
//! generation is discarded, so a stream that comes online after the operator
//! pressed stop never launches a process.
//!
//! # Unexpected exits
//!
//! While active, a watcher task wakes every `watch_interval` and whenever a
//! log pump reports its pipe closed. A child that exits outside a requested
//! stop moves the job to [`JobState::Failed`] after its sibling is torn down.
//! `start` reconciles the same way before deciding what to do.
//!
//! # Status reads
//!
//! Every transition publishes a snapshot into a `watch` channel.
//! [`RecordingJob::state`] and [`RecordingJob::summary`] read that snapshot
//! and never wait for the job lock, so a listing stays responsive while a
//! teardown is waiting out its grace period.

use crate::{
    CaptureError, CaptureMode, CaptureSettings, LineSink,
    job::{
        JobId, JobSpec, JobState, JobSummary, create_session_dir,
        strategy::{LaunchRequest, LaunchStrategy, Pipeline},
    },
    probe::{ProbeOutcome, StreamProbe, spawn_probe},
};

use std::{panic::Location, path::PathBuf, sync::Arc};

use chrono::{DateTime, Local};
use error_location::ErrorLocation;
use tokio::{
    sync::{Mutex, Notify, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

struct ActiveRun {
    pipeline: Pipeline,
    watcher: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct JobInner {
    state: JobState,
    /// Incremented by every start and stop; stale probe results and
    /// watchers compare against it.
    generation: u64,
    retired: bool,
    probe_task: Option<JoinHandle<()>>,
    active: Option<ActiveRun>,
    session_id: Option<Uuid>,
    last_error: Option<String>,
}

/// Last published view of a job, readable without the job lock.
#[derive(Debug, Clone, Default)]
struct JobSnapshot {
    state: JobState,
    session_id: Option<Uuid>,
    last_error: Option<String>,
    output: Option<PathBuf>,
    pids: Vec<u32>,
}

/// One recording task: a URL, an output root and a launch strategy.
pub struct RecordingJob {
    id: JobId,
    spec: JobSpec,
    mode: CaptureMode,
    created_at: DateTime<Local>,
    settings: Arc<CaptureSettings>,
    strategy: Arc<dyn LaunchStrategy>,
    probe: Arc<dyn StreamProbe>,
    sink: Arc<dyn LineSink>,
    inner: Mutex<JobInner>,
    snapshot: watch::Sender<JobSnapshot>,
}

impl RecordingJob {
    /// Create an idle job.
    pub fn new(
        id: JobId,
        spec: JobSpec,
        settings: Arc<CaptureSettings>,
        strategy: Arc<dyn LaunchStrategy>,
        probe: Arc<dyn StreamProbe>,
        sink: Arc<dyn LineSink>,
    ) -> Self {
        Self {
            id,
            mode: strategy.mode(),
            spec,
            created_at: Local::now(),
            settings,
            strategy,
            probe,
            sink,
            inner: Mutex::new(JobInner::default()),
            snapshot: watch::Sender::new(JobSnapshot::default()),
        }
    }

    /// Registry identifier.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Parameters the job was registered with.
    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    /// Effective capture mode.
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Registration time.
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Begin probing; a successful probe launches the pipeline.
    ///
    /// No-op while probing or active, so back-to-back calls launch one
    /// pipeline. Returns the state after the call.
    #[instrument(skip(self), fields(job_id = %self.id, job = %self.spec.name))]
    pub async fn start(self: &Arc<Self>) -> JobState {
        let mut inner = self.inner.lock().await;

        if inner.retired {
            warn!("Start ignored, job is being removed");
            return inner.state;
        }

        self.reconcile(&mut inner).await;

        match inner.state {
            JobState::Probing | JobState::Active => {
                self.publish(&inner);
                debug!(state = %inner.state, "Start ignored");
                return inner.state;
            }
            JobState::Idle | JobState::Failed => {}
        }

        if let Some(stale) = inner.probe_task.take() {
            stale.abort();
        }

        inner.generation += 1;
        let generation = inner.generation;
        let session_id = Uuid::new_v4();

        inner.state = JobState::Probing;
        inner.session_id = Some(session_id);
        inner.last_error = None;

        info!(session_id = %session_id, url = %self.spec.url, "Probing stream");

        let job = Arc::clone(self);
        inner.probe_task = Some(spawn_probe(
            Arc::clone(&self.probe),
            self.spec.url.clone(),
            self.settings.probe_timeout,
            move |outcome| async move { job.on_probe_result(generation, outcome).await },
        ));

        self.publish(&inner);
        JobState::Probing
    }

    /// Stop whatever is running and return to idle.
    ///
    /// Safe to call repeatedly and from any state. If teardown itself fails
    /// the job is left [`JobState::Failed`]; a further call acknowledges it.
    pub async fn stop(&self) -> JobState {
        self.stop_and_maybe_retire(false).await
    }

    /// Stop the job for good; later `start` calls are ignored.
    ///
    /// Retiring and stopping happen under one lock acquisition, so a probe
    /// finishing in between cannot launch a pipeline.
    pub async fn shutdown(&self) -> JobState {
        self.stop_and_maybe_retire(true).await
    }

    #[instrument(skip(self), fields(job_id = %self.id, job = %self.spec.name))]
    async fn stop_and_maybe_retire(&self, retire: bool) -> JobState {
        let (state, stale_probe) = {
            let mut inner = self.inner.lock().await;
            if retire {
                inner.retired = true;
            }
            let stale_probe = inner.probe_task.take();

            match inner.state {
                JobState::Idle => debug!("Stop ignored, job is idle"),
                JobState::Probing => {
                    inner.generation += 1;
                    inner.state = JobState::Idle;
                    info!("Probe cancelled");
                }
                JobState::Active | JobState::Failed => {
                    inner.generation += 1;
                    match self.teardown(&mut inner).await {
                        Ok(()) => {
                            inner.state = JobState::Idle;
                            info!("Job stopped");
                        }
                        Err(e) => {
                            error!(error = %e, "Teardown failed");
                            inner.state = JobState::Failed;
                            inner.last_error = Some(e.to_string());
                        }
                    }
                }
            }

            self.publish(&inner);
            (inner.state, stale_probe)
        };

        // Outside the lock: the probe callback needs it to see the new
        // generation and bail out.
        if let Some(probe) = stale_probe {
            self.join_probe(probe).await;
        }

        state
    }

    /// Current state as of the last transition.
    pub fn state(&self) -> JobState {
        self.snapshot.borrow().state
    }

    /// Snapshot for listings as of the last transition.
    pub fn summary(&self) -> JobSummary {
        let snapshot = self.snapshot.borrow().clone();

        JobSummary {
            id: self.id,
            name: self.spec.name.clone(),
            url: self.spec.url.clone(),
            output_dir: self.spec.output_root.clone(),
            mode: self.mode,
            state: snapshot.state,
            label: snapshot.state.label(),
            created_at: self.created_at,
            session_id: snapshot.session_id,
            output: snapshot.output,
            pids: snapshot.pids,
            last_error: snapshot.last_error,
        }
    }

    async fn on_probe_result(self: Arc<Self>, generation: u64, outcome: ProbeOutcome) {
        let mut inner = self.inner.lock().await;

        if inner.retired || inner.generation != generation || inner.state != JobState::Probing {
            debug!(job_id = %self.id, outcome = %outcome, "Discarding stale probe result");
            return;
        }

        // Our own handle; dropping it detaches this task.
        inner.probe_task = None;

        if let Some(error) = outcome.into_error(&self.spec.url) {
            warn!(job_id = %self.id, error = %error, "Stream unavailable");
            inner.state = JobState::Failed;
            inner.last_error = Some(error.to_string());
            self.publish(&inner);
            return;
        }

        match self.launch(generation).await {
            Ok(run) => {
                info!(job_id = %self.id, pids = ?run.pipeline.pids(), "Recording active");
                inner.active = Some(run);
                inner.state = JobState::Active;
            }
            Err(e) => {
                error!(job_id = %self.id, url = %self.spec.url, error = %e, "Launch failed");
                inner.state = JobState::Failed;
                inner.last_error = Some(e.to_string());
            }
        }

        self.publish(&inner);
    }

    async fn launch(self: &Arc<Self>, generation: u64) -> crate::CoreResult<ActiveRun> {
        let session_dir = create_session_dir(&self.spec.output_root, &self.spec.name, Local::now())?;
        let exit_notify = Arc::new(Notify::new());

        let pipeline = self
            .strategy
            .launch(LaunchRequest {
                job_name: &self.spec.name,
                url: &self.spec.url,
                session_dir: &session_dir,
                settings: &self.settings,
                sink: Arc::clone(&self.sink),
                exit_notify: Arc::clone(&exit_notify),
            })
            .await?;

        let watcher = tokio::spawn(Arc::clone(self).watch(generation, exit_notify));

        Ok(ActiveRun {
            pipeline,
            watcher: Some(watcher),
        })
    }

    async fn watch(self: Arc<Self>, generation: u64, exit_notify: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.settings.watch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = exit_notify.notified() => {}
            }

            let mut inner = self.inner.lock().await;
            if inner.generation != generation || inner.state != JobState::Active {
                return;
            }
            if self.fail_on_exit(&mut inner, true).await {
                return;
            }
        }
    }

    async fn reconcile(&self, inner: &mut JobInner) {
        if inner.state == JobState::Active {
            self.fail_on_exit(inner, false).await;
        }
    }

    /// Tear down and fail the job if any child has exited. Returns whether it did.
    async fn fail_on_exit(&self, inner: &mut JobInner, from_watcher: bool) -> bool {
        let Some(run) = inner.active.as_mut() else {
            return false;
        };
        let Some((role, status)) = run.pipeline.exited() else {
            return false;
        };

        if from_watcher {
            // Teardown must not abort the task it is running on.
            run.watcher = None;
        }

        let exit = CaptureError::UnexpectedExit {
            role,
            status: status.to_string(),
            location: ErrorLocation::from(Location::caller()),
        };
        warn!(job_id = %self.id, error = %exit, "Capture process exited unexpectedly");

        let teardown = self.teardown(inner).await;
        inner.state = JobState::Failed;
        inner.last_error = Some(match teardown {
            Ok(()) => exit.to_string(),
            Err(e) => format!("{}; teardown: {}", exit, e),
        });
        self.publish(inner);

        true
    }

    async fn teardown(&self, inner: &mut JobInner) -> crate::CoreResult<()> {
        let Some(mut run) = inner.active.take() else {
            return Ok(());
        };

        if let Some(watcher) = run.watcher.take() {
            watcher.abort();
            let _ = watcher.await;
        }

        run.pipeline
            .shutdown(self.settings.grace_period, self.settings.join_timeout)
            .await
    }

    fn publish(&self, inner: &JobInner) {
        let (output, pids) = match inner.active.as_ref() {
            Some(run) => (
                Some(run.pipeline.output().to_path_buf()),
                run.pipeline.pids(),
            ),
            None => (None, Vec::new()),
        };

        self.snapshot.send_replace(JobSnapshot {
            state: inner.state,
            session_id: inner.session_id,
            last_error: inner.last_error.clone(),
            output,
            pids,
        });
    }

    async fn join_probe(&self, mut probe: JoinHandle<()>) {
        match tokio::time::timeout(self.settings.join_timeout, &mut probe).await {
            Ok(_) => debug!(job_id = %self.id, "Probe task finished"),
            Err(_) => {
                debug!(job_id = %self.id, "Probe task still running, aborting");
                probe.abort();
            }
        }
    }
}
