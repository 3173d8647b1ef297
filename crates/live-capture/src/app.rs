use crate::{AppCommand, AppResult, Selection, config::Config, console_handler::HELP};

use live_capture_core::{JobId, JobRegistry, JobSpec, JobState, JobSummary};

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};
use tracing::{error, info, instrument, warn};

/// Main application state.
///
/// Owns the job registry and executes console commands against it. Start,
/// stop and delete run as background tasks so a slow teardown never holds up
/// the next command. Every exit path (quit, Ctrl-C, SIGTERM, closed input)
/// stops all jobs and drains those tasks before returning.
pub struct App {
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) config: Config,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) tasks: JoinSet<()>,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Live-Capture starting");

        self.register_configured_jobs().await;

        let terminate = shutdown_signal();
        tokio::pin!(terminate);

        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    if cmd == AppCommand::Shutdown {
                        info!("Shutdown requested");
                        break;
                    }
                    self.handle_command(cmd);
                }

                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = ?e, "Command task failed");
                    }
                }

                _ = &mut terminate => {
                    info!("Termination signal received");
                    break;
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        self.registry.shutdown().await;
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = ?e, "Command task failed");
            }
        }

        let _ = self.shutdown_tx.send(true);
        info!("Live-Capture shut down successfully");

        Ok(())
    }

    async fn register_configured_jobs(&self) {
        let mut autostart = Vec::new();

        for job in &self.config.jobs {
            match self.registry.add(self.config.job_spec(job)) {
                Ok(id) => {
                    if job.autostart {
                        autostart.push(id);
                    }
                }
                Err(e) => error!(job = %job.name, error = %e, "Failed to register configured job"),
            }
        }

        if !autostart.is_empty() {
            info!(jobs = autostart.len(), "Autostarting configured jobs");
            self.registry.start_all(&autostart).await;
        }
    }

    #[instrument(skip(self))]
    pub(crate) fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::AddJob {
                name,
                url,
                output_dir,
            } => {
                let output_root = output_dir.unwrap_or_else(|| self.config.capture.output_root.clone());
                match self.registry.add(JobSpec::new(name, url, output_root)) {
                    Ok(id) => println!("added job {}", id),
                    Err(e) => {
                        warn!(error = %e, "Add rejected");
                        println!("add failed: {}", e);
                    }
                }
            }
            AppCommand::StartJobs(selection) => {
                let ids = self.select(selection);
                let registry = Arc::clone(&self.registry);
                self.tasks
                    .spawn(async move { report("start", registry.start_all(&ids).await) });
            }
            AppCommand::StopJobs(selection) => {
                let ids = self.select(selection);
                let registry = Arc::clone(&self.registry);
                self.tasks
                    .spawn(async move { report("stop", registry.stop_all(&ids).await) });
            }
            AppCommand::DeleteJob(id) => {
                let registry = Arc::clone(&self.registry);
                self.tasks.spawn(async move {
                    match registry.remove(id).await {
                        Ok(summary) => println!("deleted job {} ({})", id, summary.name),
                        Err(e) => println!("delete failed: {}", e),
                    }
                });
            }
            AppCommand::ListJobs => {
                print_jobs(&self.registry.list_jobs());
            }
            AppCommand::Help => println!("{}", HELP),
            AppCommand::Shutdown => {}
        }
    }

    fn select(&self, selection: Selection) -> Vec<JobId> {
        match selection {
            Selection::All => self.registry.ids(),
            Selection::One(id) => vec![id],
        }
    }
}

fn report(action: &str, results: Vec<(JobId, live_capture_core::CoreResult<JobState>)>) {
    if results.is_empty() {
        println!("no jobs to {}", action);
    }
    for (id, result) in results {
        match result {
            Ok(state) => println!("job {}: {}", id, state),
            Err(e) => println!("{} failed for job {}: {}", action, id, e),
        }
    }
}

pub(crate) fn format_jobs(jobs: &[JobSummary]) -> String {
    let mut out = format!(
        "{:<4} {:<16} {:<10} {:<19} {:<40} {}",
        "ID", "NAME", "STATUS", "CREATED", "URL", "OUTPUT"
    );
    for job in jobs {
        out.push('\n');
        out.push_str(&format!(
            "{:<4} {:<16} {:<10} {:<19} {:<40} {}",
            job.id,
            job.name,
            job.label,
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
            job.url,
            job.output_dir.display()
        ));
    }
    out
}

fn print_jobs(jobs: &[JobSummary]) {
    if jobs.is_empty() {
        println!("no jobs");
    } else {
        println!("{}", format_jobs(jobs));
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}
