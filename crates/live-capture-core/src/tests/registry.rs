use crate::{
    CaptureError, CaptureMode, JobId, JobRegistry, JobSpec, JobState,
    tests::support::{
        CollectingSink, LOOPING_FETCHER, StubProbe, pid_alive, test_settings, wait_for_file,
        write_script,
    },
};

use std::{path::Path, sync::Arc, time::Duration};

/// Fetcher that ignores SIGTERM, so stopping it waits out the grace period.
const TERM_IGNORING_FETCHER: &str = r#"#!/bin/sh
trap '' TERM
touch "$(dirname "$0")/trapped"
while true; do sleep 0.1; done
"#;

fn registry_with(fetcher: &Path, probe: Arc<StubProbe>) -> JobRegistry {
    JobRegistry::with_collaborators(
        test_settings(fetcher, Path::new("ffmpeg")),
        probe,
        Arc::new(CollectingSink::default()),
    )
}

async fn wait_all_active(registry: &JobRegistry, ids: &[JobId]) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let mut all = true;
        for &id in ids {
            let Some(job) = registry.get(id) else {
                return false;
            };
            if job.state() != JobState::Active {
                all = false;
            }
        }
        if all {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// WHAT: Identifiers increase and are never reused after removal
/// WHY: Operators address jobs by id; a reused id could stop the wrong stream
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_removed_job_when_adding_then_new_id_not_reused() {
    // Given: A registry with two jobs
    let root = tempfile::tempdir().unwrap();
    let registry = registry_with(Path::new("streamlink"), StubProbe::available(Duration::ZERO));
    let first = registry.add(JobSpec::new("a", "https://a.test", root.path())).unwrap();
    let second = registry.add(JobSpec::new("b", "https://b.test", root.path())).unwrap();

    // When: Removing the last one and adding another
    registry.remove(second).await.unwrap();
    let third = registry.add(JobSpec::new("c", "https://c.test", root.path())).unwrap();

    // Then: Ids are 1, 2, 3 and listing is in insertion order
    assert_eq!((first, second, third), (JobId(1), JobId(2), JobId(3)));
    assert_eq!(registry.ids(), vec![JobId(1), JobId(3)]);
    let names: Vec<String> = registry
        .list_jobs()
        .into_iter()
        .map(|summary| summary.name)
        .collect();
    assert_eq!(names, vec!["a", "c"]);
}

/// WHAT: Invalid specs are rejected and consume no id
/// WHY: Empty names or URLs would produce unusable jobs
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_fields_when_adding_then_invalid_job_spec() {
    // Given: An empty registry
    let registry = registry_with(Path::new("streamlink"), StubProbe::available(Duration::ZERO));

    // When: Adding specs with an empty name, url or output directory
    let no_name = registry.add(JobSpec::new(" ", "https://a.test", "/rec"));
    let no_url = registry.add(JobSpec::new("a", "", "/rec"));
    let no_output = registry.add(JobSpec::new("a", "https://a.test", ""));

    // Then: All fail and the registry stays empty
    for result in [no_name, no_url, no_output] {
        assert!(matches!(result, Err(CaptureError::InvalidJobSpec { .. })));
    }
    assert!(registry.is_empty());
    let valid = registry.add(JobSpec::new("a", "https://a.test", "/rec")).unwrap();
    assert_eq!(valid, JobId(1));
}

/// WHAT: Operations on an unknown id report UnknownJob
/// WHY: A stale id from a listing must not panic or act on another job
#[tokio::test]
async fn given_unknown_id_when_operating_then_unknown_job() {
    // Given: An empty registry
    let registry = registry_with(Path::new("streamlink"), StubProbe::available(Duration::ZERO));

    // When / Then: Start, stop and remove all fail with UnknownJob
    assert!(matches!(
        registry.start(JobId(7)).await,
        Err(CaptureError::UnknownJob { id: JobId(7), .. })
    ));
    assert!(matches!(
        registry.stop(JobId(7)).await,
        Err(CaptureError::UnknownJob { .. })
    ));
    assert!(matches!(
        registry.remove(JobId(7)).await,
        Err(CaptureError::UnknownJob { .. })
    ));
}

/// WHAT: Removing one active job leaves the others recording
/// WHY: Jobs are isolated; deleting one stream must not interrupt another
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_three_active_jobs_when_removing_middle_then_others_unaffected() {
    // Given: Three active jobs
    let tools = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let fetcher = write_script(tools.path(), "fetcher.sh", LOOPING_FETCHER);
    let registry = registry_with(&fetcher, StubProbe::available(Duration::ZERO));
    let ids: Vec<JobId> = ["one", "two", "three"]
        .into_iter()
        .map(|name| {
            registry
                .add(JobSpec::new(name, format!("https://{name}.test"), root.path()))
                .unwrap()
        })
        .collect();
    registry.start_all(&ids).await;
    assert!(wait_all_active(&registry, &ids).await);
    let removed_pids = registry.get(ids[1]).unwrap().summary().pids;

    // When: Removing the second job
    let summary = registry.remove(ids[1]).await.unwrap();

    // Then: It is gone with its processes, the others keep recording
    assert_eq!(summary.state, JobState::Idle);
    assert!(removed_pids.iter().all(|&pid| !pid_alive(pid)));
    assert_eq!(registry.ids(), vec![ids[0], ids[2]]);
    for id in [ids[0], ids[2]] {
        let summary = registry.get(id).unwrap().summary();
        assert_eq!(summary.state, JobState::Active);
        assert!(summary.pids.iter().all(|&pid| pid_alive(pid)));
    }

    registry.shutdown().await;
    assert!(registry.is_empty());
}

/// WHAT: A batch start keeps going past an unknown id
/// WHY: One bad entry in "start all" must not block the rest
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_batch_with_unknown_id_when_starting_all_then_others_started() {
    // Given: Two jobs and a batch including an unknown id between them
    let root = tempfile::tempdir().unwrap();
    let probe = StubProbe::available(Duration::from_millis(200));
    let registry = registry_with(Path::new("streamlink"), probe.clone());
    let a = registry.add(JobSpec::new("a", "https://a.test", root.path())).unwrap();
    let b = registry.add(JobSpec::new("b", "https://b.test", root.path())).unwrap();

    // When: Starting the batch
    let results = registry.start_all(&[a, JobId(99), b]).await;

    // Then: Each id has its own result
    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], (id, Ok(JobState::Probing)) if id == a));
    assert!(matches!(results[1], (JobId(99), Err(CaptureError::UnknownJob { .. }))));
    assert!(matches!(results[2], (id, Ok(JobState::Probing)) if id == b));

    // And: Both probes run; they are spawned, so give them a moment to begin
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while probe.calls() < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(probe.calls(), 2);

    // And: Stopping all returns both to Idle
    let stopped = registry.stop_all(&registry.ids()).await;
    assert!(stopped.iter().all(|(_, r)| matches!(r, Ok(JobState::Idle))));
}

/// WHAT: A per-job mode overrides the registry default
/// WHY: Some streams are recorded segmented while others are not
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_mode_override_when_adding_then_job_uses_it() {
    // Given: A registry defaulting to single-file mode
    let registry = registry_with(Path::new("streamlink"), StubProbe::available(Duration::ZERO));

    // When: Adding one job with and one without an override
    let plain = registry.add(JobSpec::new("a", "https://a.test", "/rec")).unwrap();
    let segmented = registry
        .add(JobSpec::new("b", "https://b.test", "/rec").with_mode(CaptureMode::Segment))
        .unwrap();

    // Then: Each job reports its effective mode
    assert_eq!(registry.get(plain).unwrap().mode(), CaptureMode::Single);
    assert_eq!(registry.get(segmented).unwrap().mode(), CaptureMode::Segment);
}

/// WHAT: Listing jobs does not wait for a job that is stopping
/// WHY: A fetcher ignoring SIGTERM holds its stop for the whole grace period
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_job_ignoring_sigterm_when_stopping_then_listing_not_blocked() {
    // Given: An active job whose fetcher ignores SIGTERM, with a 2 second grace
    let tools = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let fetcher = write_script(tools.path(), "fetcher.sh", TERM_IGNORING_FETCHER);
    let mut settings = test_settings(&fetcher, Path::new("ffmpeg"));
    settings.grace_period = Duration::from_secs(2);
    let registry = Arc::new(JobRegistry::with_collaborators(
        settings,
        StubProbe::available(Duration::ZERO),
        Arc::new(CollectingSink::default()),
    ));
    let id = registry
        .add(JobSpec::new("stubborn", "https://stubborn.test", root.path()))
        .unwrap();
    registry.start(id).await.unwrap();
    assert!(wait_all_active(&registry, &[id]).await);
    assert!(wait_for_file(&tools.path().join("trapped"), Duration::from_secs(2)).await);

    // When: Stopping in the background, then listing while the stop is in its grace period
    let stopping = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { registry.stop(id).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let listed_at = tokio::time::Instant::now();
    let jobs = registry.list_jobs();
    let state = registry.get(id).unwrap().state();
    let listing_took = listed_at.elapsed();

    // Then: The listing returns at once, showing the last published state
    assert!(listing_took < Duration::from_millis(500));
    assert!(!stopping.is_finished());
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].state, JobState::Active);
    assert_eq!(state, JobState::Active);

    // And: The stop completes after the forced kill and is visible afterwards
    let final_state = stopping.await.unwrap().unwrap();
    assert_eq!(final_state, JobState::Idle);
    assert_eq!(registry.get(id).unwrap().state(), JobState::Idle);
    assert!(registry.list_jobs()[0].pids.is_empty());
}
