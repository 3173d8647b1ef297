//! Ownership of one external OS process.
//!
//! Every child is spawned into its own process group on unix so that a stop
//! request reaches helpers the child may have forked (streamlink launching
//! ffmpeg, for instance). Termination is SIGTERM to the group, a bounded wait,
//! then SIGKILL to the group.

use crate::{
    CaptureError, CoreResult,
    process::{CommandSpec, ProcessRole},
};

use std::{
    io,
    panic::Location,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, instrument, warn};

/// How a [`ProcessHandle::terminate`] call concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// The process had already exited before the call.
    AlreadyExited(ExitStatus),
    /// The process honoured the graceful stop signal.
    Exited(ExitStatus),
    /// The grace period elapsed and the process was killed.
    ForceKilled(ExitStatus),
}

impl TerminateOutcome {
    /// Exit status of the reaped process.
    pub fn status(&self) -> ExitStatus {
        match self {
            TerminateOutcome::AlreadyExited(status)
            | TerminateOutcome::Exited(status)
            | TerminateOutcome::ForceKilled(status) => *status,
        }
    }
}

/// A launched child process owned by exactly one job.
#[derive(Debug)]
pub struct ProcessHandle {
    role: ProcessRole,
    pid: Option<u32>,
    child: Child,
    exit: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawn `spec` with the given stdin and stdout; stderr is always piped.
    ///
    /// The passed stdio handles are moved into the command and released when
    /// this function returns, so a pipe handed in as `stdin` is held open only
    /// by the child.
    ///
    /// # Errors
    ///
    /// [`CaptureError::ExecutableNotFound`] when the program does not exist,
    /// [`CaptureError::SpawnFailed`] for every other spawn failure.
    #[track_caller]
    #[instrument(skip(stdin, stdout), fields(command = %spec))]
    pub fn launch(
        role: ProcessRole,
        spec: &CommandSpec,
        stdin: Option<Stdio>,
        stdout: Stdio,
    ) -> CoreResult<Self> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(stdin.unwrap_or_else(Stdio::null))
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CaptureError::ExecutableNotFound {
                role,
                program: spec.program.clone(),
                location: ErrorLocation::from(Location::caller()),
            },
            _ => CaptureError::SpawnFailed {
                role,
                program: spec.program.clone(),
                source,
                location: ErrorLocation::from(Location::caller()),
            },
        })?;

        drop(command);

        let pid = child.id();
        info!(role = %role, pid = ?pid, "Process launched");

        Ok(Self {
            role,
            pid,
            child,
            exit: None,
        })
    }

    /// Role this process plays in its pipeline.
    pub fn role(&self) -> ProcessRole {
        self.role
    }

    /// OS process id captured at launch.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the piped standard output, if it was requested and not yet taken.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the piped diagnostic stream, if not yet taken.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Exit status if the process has exited, reaping it without blocking.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        if self.exit.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.exit = status,
                Err(e) => debug!(role = %self.role, error = ?e, "try_wait failed"),
            }
        }
        self.exit
    }

    /// Whether the process is still running.
    pub fn is_alive(&mut self) -> bool {
        self.exit_status().is_none()
    }

    /// Wait for the process to exit on its own.
    pub async fn wait(&mut self) -> CoreResult<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit = Some(status);
        Ok(status)
    }

    /// Stop the process: graceful signal, up to `grace` of waiting, then kill.
    ///
    /// Calling this on a process that already exited is a no-op returning
    /// [`TerminateOutcome::AlreadyExited`].
    ///
    /// # Errors
    ///
    /// [`CaptureError::TerminationFailed`] only when the process could not be
    /// reaped even after a forced kill.
    #[instrument(skip(self), fields(role = %self.role, pid = ?self.pid))]
    pub async fn terminate(&mut self, grace: Duration) -> CoreResult<TerminateOutcome> {
        if let Some(status) = self.exit_status() {
            self.sweep_group();
            debug!(status = %status, "Process already exited");
            return Ok(TerminateOutcome::AlreadyExited(status));
        }

        self.signal_graceful();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit = Some(status);
                self.sweep_group();
                info!(status = %status, "Process stopped");
                Ok(TerminateOutcome::Exited(status))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Wait after graceful stop failed, killing");
                self.force_kill();
                Err(CaptureError::TerminationFailed {
                    role: self.role,
                    pid: self.pid,
                    reason: format!("wait failed: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis(), "Graceful stop timed out, killing");
                self.force_kill();

                let status = match tokio::time::timeout(grace, self.child.wait()).await {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) => {
                        return Err(CaptureError::TerminationFailed {
                            role: self.role,
                            pid: self.pid,
                            reason: format!("wait after kill failed: {}", e),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                    Err(_) => {
                        return Err(CaptureError::TerminationFailed {
                            role: self.role,
                            pid: self.pid,
                            reason: "process survived SIGKILL".to_string(),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                };

                self.exit = Some(status);
                info!(status = %status, "Process killed");
                Ok(TerminateOutcome::ForceKilled(status))
            }
        }
    }

    #[cfg(unix)]
    fn signal_graceful(&self) {
        self.signal_group(nix::sys::signal::Signal::SIGTERM);
    }

    #[cfg(not(unix))]
    fn signal_graceful(&mut self) {
        // No portable graceful signal; the kill follows immediately.
        if let Err(e) = self.child.start_kill() {
            debug!(role = %self.role, error = ?e, "start_kill failed");
        }
    }

    fn force_kill(&mut self) {
        #[cfg(unix)]
        self.signal_group(nix::sys::signal::Signal::SIGKILL);

        if let Err(e) = self.child.start_kill() {
            debug!(role = %self.role, error = ?e, "start_kill failed");
        }
    }

    /// Kill whatever is left in the group once the leader is gone.
    fn sweep_group(&self) {
        #[cfg(unix)]
        self.signal_group(nix::sys::signal::Signal::SIGKILL);
    }

    #[cfg(unix)]
    fn signal_group(&self, signal: nix::sys::signal::Signal) {
        use nix::{errno::Errno, sys::signal::killpg, unistd::Pid};

        let Some(pgid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };

        match killpg(Pid::from_raw(pgid), signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(role = %self.role, pgid, signal = ?signal, error = %e, "Signal delivery failed"),
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.exit_status().is_none() {
            warn!(role = %self.role, pid = ?self.pid, "Dropping live process, killing");
            self.force_kill();
        }
    }
}
