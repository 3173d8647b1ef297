//! Line-oriented console control surface.
//!
//! Reads commands from stdin, parses them into [`AppCommand`]s and forwards
//! them to the main application over an async channel.

use crate::{AppCommand, AppError, AppResult, Selection};

use live_capture_core::JobId;

use std::{io::BufRead, panic::Location, path::PathBuf, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Command reference printed by `help`.
pub(crate) const HELP: &str = "\
Commands:
  add <name> <url> [output_dir]   register a job
  start <id|all>                  start one job or every job
  stop <id|all>                   stop one job or every job
  delete <id>                     stop and remove a job
  list                            show every job
  help                            show this text
  quit                            stop everything and exit";

/// Parse one console line.
///
/// Returns `Ok(None)` for blank lines.
#[track_caller]
pub(crate) fn parse_command(line: &str) -> AppResult<Option<AppCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("add", [name, url]) => AppCommand::AddJob {
            name: name.to_string(),
            url: url.to_string(),
            output_dir: None,
        },
        ("add", [name, url, output_dir]) => AppCommand::AddJob {
            name: name.to_string(),
            url: url.to_string(),
            output_dir: Some(PathBuf::from(output_dir)),
        },
        ("add", _) => return Err(invalid("usage: add <name> <url> [output_dir]")),
        ("start", [target]) => AppCommand::StartJobs(parse_selection(target)?),
        ("start", _) => return Err(invalid("usage: start <id|all>")),
        ("stop", [target]) => AppCommand::StopJobs(parse_selection(target)?),
        ("stop", _) => return Err(invalid("usage: stop <id|all>")),
        ("delete", [id]) => AppCommand::DeleteJob(parse_id(id)?),
        ("delete", _) => return Err(invalid("usage: delete <id>")),
        ("list", []) => AppCommand::ListJobs,
        ("help", []) => AppCommand::Help,
        ("quit" | "exit", []) => AppCommand::Shutdown,
        (other, _) => return Err(invalid(&format!("unknown command {:?}, try help", other))),
    };

    Ok(Some(command))
}

#[track_caller]
fn parse_selection(target: &str) -> AppResult<Selection> {
    if target.eq_ignore_ascii_case("all") {
        Ok(Selection::All)
    } else {
        parse_id(target).map(Selection::One)
    }
}

#[track_caller]
fn parse_id(raw: &str) -> AppResult<JobId> {
    raw.parse::<u64>()
        .map(JobId)
        .map_err(|_| invalid(&format!("{:?} is not a job id", raw)))
}

#[track_caller]
fn invalid(reason: &str) -> AppError {
    AppError::InvalidCommand {
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Console input loop.
pub struct ConsoleHandler {
    command_tx: mpsc::Sender<AppCommand>,
}

impl ConsoleHandler {
    /// Create a handler forwarding commands into `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Run the console loop until shutdown or end of input.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

        // Stdin has no async cancellation; a blocking task forwards lines and
        // exits on the first failed send once line_rx is dropped.
        let handle = tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });

        println!("{}", HELP);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Console handler shutting down");
                    break;
                }
                line = line_rx.recv() => {
                    let Some(line) = line else {
                        info!("Console input closed");
                        self.send(AppCommand::Shutdown).await?;
                        break;
                    };
                    match parse_command(&line) {
                        Ok(Some(command)) => {
                            let quit = command == AppCommand::Shutdown;
                            self.send(command).await?;
                            if quit {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            debug!(error = %e, "Rejected console input");
                            if let AppError::InvalidCommand { reason, .. } = &e {
                                println!("{}", reason);
                            }
                        }
                    }
                }
            }
        }

        drop(line_rx);

        // The blocking reader may sit in read_line until the next newline;
        // the runtime drops it on exit.
        match tokio::time::timeout(Duration::from_secs(1), handle).await {
            Ok(Ok(())) => debug!("Console reader stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Console reader task panicked"),
            Err(_) => debug!("Console reader did not stop within timeout, will be cleaned up on exit"),
        }

        Ok(())
    }

    async fn send(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send console command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
