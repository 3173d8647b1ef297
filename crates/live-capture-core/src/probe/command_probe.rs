use crate::{
    ProbeStrictness,
    probe::{ProbeOutcome, StreamProbe},
};

use std::{io, path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Probes a URL by running `<fetcher> <url>` and discarding its output.
///
/// With [`ProbeStrictness::Lenient`] any completed run counts as available;
/// [`ProbeStrictness::ExitCode`] additionally requires exit status zero.
/// The timeout is applied by [`spawn_probe`](crate::probe::spawn_probe); the
/// child is spawned with `kill_on_drop` so an abandoned check leaves nothing
/// behind.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: PathBuf,
    strictness: ProbeStrictness,
}

impl CommandProbe {
    /// Create a probe that runs `program`.
    pub fn new(program: impl Into<PathBuf>, strictness: ProbeStrictness) -> Self {
        Self {
            program: program.into(),
            strictness,
        }
    }
}

#[async_trait]
impl StreamProbe for CommandProbe {
    #[instrument(skip(self), fields(program = ?self.program))]
    async fn check(&self, url: &str) -> ProbeOutcome {
        let mut command = Command::new(&self.program);
        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return ProbeOutcome::ExecutableMissing {
                    program: self.program.clone(),
                };
            }
            Err(e) => {
                return ProbeOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                return ProbeOutcome::Failed {
                    reason: format!("wait failed: {}", e),
                };
            }
        };

        debug!(status = %status, "Probe command exited");

        match self.strictness {
            ProbeStrictness::Lenient => ProbeOutcome::Available,
            ProbeStrictness::ExitCode if status.success() => ProbeOutcome::Available,
            ProbeStrictness::ExitCode => ProbeOutcome::Offline {
                code: status.code(),
            },
        }
    }
}
