use crate::{
    CaptureSettings, JobState, LineSink, ProbeOutcome, RecordingJob, ToolPaths,
    probe::StreamProbe,
};

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use nix::{sys::signal::kill, unistd::Pid};

/// Fetcher that records its arguments, then appends to its `-o` target
/// (stdout for `-`) until killed.
pub(crate) const LOOPING_FETCHER: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/fetcher.args"
echo "fetching $1" >&2
out="$4"
while true; do
  if [ "$out" = "-" ]; then
    echo data || exit 1
  else
    echo data >> "$out"
  fi
  sleep 0.1
done
"#;

/// Fetcher that exits on its own shortly after starting.
pub(crate) const SHORT_LIVED_FETCHER: &str = r#"#!/bin/sh
echo "fetching $1" >&2
sleep 0.2
exit 0
"#;

/// Segmenter writing one numbered file per `-segment_time` seconds.
pub(crate) const STUB_SEGMENTER: &str = r#"#!/bin/sh
secs=1
while [ $# -gt 1 ]; do
  if [ "$1" = "-segment_time" ]; then secs="$2"; fi
  shift
done
pattern="$1"
cat > /dev/null &
n=1
while true; do
  f=$(printf "$pattern" "$n")
  echo "opening $f" >&2
  echo segment > "$f"
  n=$((n + 1))
  sleep "$secs"
done
"#;

/// Write an executable shell script into `dir`.
#[allow(clippy::unwrap_used)]
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Settings with short timings pointing at the given tools.
pub(crate) fn test_settings(fetcher: &Path, segmenter: &Path) -> CaptureSettings {
    CaptureSettings {
        tools: ToolPaths {
            fetcher: fetcher.to_path_buf(),
            segmenter: segmenter.to_path_buf(),
            quality: "best".to_string(),
        },
        probe_timeout: Duration::from_secs(2),
        grace_period: Duration::from_secs(1),
        watch_interval: Duration::from_millis(50),
        join_timeout: Duration::from_millis(500),
        ..CaptureSettings::default()
    }
}

/// Probe answering with a fixed outcome after a fixed delay.
pub(crate) struct StubProbe {
    delay: Duration,
    outcome: ProbeOutcome,
    calls: AtomicUsize,
}

impl StubProbe {
    pub(crate) fn new(delay: Duration, outcome: ProbeOutcome) -> Arc<Self> {
        Arc::new(Self {
            delay,
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn available(delay: Duration) -> Arc<Self> {
        Self::new(delay, ProbeOutcome::Available)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamProbe for StubProbe {
    async fn check(&self, _url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

/// Sink keeping every line it receives.
#[derive(Default)]
pub(crate) struct CollectingSink {
    lines: Mutex<Vec<(String, String)>>,
}

impl CollectingSink {
    #[allow(clippy::unwrap_used)]
    pub(crate) fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl LineSink for CollectingSink {
    #[allow(clippy::unwrap_used)]
    fn accept(&self, prefix: &str, line: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((prefix.to_string(), line.to_string()));
    }
}

/// Whether a process with `pid` still exists.
pub(crate) fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Poll `job` until it reaches `target` or `timeout` elapses.
pub(crate) async fn wait_for_state(job: &RecordingJob, target: JobState, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if job.state() == target {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Poll until `path` exists or `timeout` elapses.
pub(crate) async fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while !path.exists() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

/// The single session directory created for `job_name` under `root`.
#[allow(clippy::unwrap_used)]
pub(crate) fn session_dirs(root: &Path, job_name: &str) -> Vec<PathBuf> {
    let base = root.join(job_name);
    if !base.exists() {
        return Vec::new();
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(base)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    dirs.sort();
    dirs
}
