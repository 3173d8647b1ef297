//! Stream availability probing.
//!
//! A probe never blocks the caller: [`spawn_probe`] runs it on a background
//! task, bounds it by a timeout and hands exactly one [`ProbeOutcome`] to the
//! supplied callback.

mod command_probe;
mod outcome;

pub use {command_probe::CommandProbe, outcome::ProbeOutcome};

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

/// Checks whether a stream URL currently carries live content.
#[async_trait]
pub trait StreamProbe: Send + Sync {
    /// Inspect `url`. Implementations resolve every failure into an outcome.
    async fn check(&self, url: &str) -> ProbeOutcome;
}

/// Run `probe` for `url` in the background and deliver the outcome once.
///
/// If `timeout` elapses first the in-flight check is dropped (which kills any
/// probe child spawned with `kill_on_drop`) and the callback receives
/// [`ProbeOutcome::TimedOut`].
pub fn spawn_probe<F, Fut>(
    probe: Arc<dyn StreamProbe>,
    url: String,
    timeout: Duration,
    callback: F,
) -> JoinHandle<()>
where
    F: FnOnce(ProbeOutcome) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = match tokio::time::timeout(timeout, probe.check(&url)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::TimedOut { timeout },
        };

        debug!(url = %url, outcome = %outcome, "Probe finished");

        callback(outcome).await;
    })
}
