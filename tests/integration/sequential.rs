//! Sequential execution ordering tests.
//!
//! With `--sequential`, exactly one child process may be alive at a time
//! and tasks run in document order even when several are ready at once.

use chaosup::orchestration::SchedulerEvent;
use chaosup::pipeline::{
    APPLY_CLUSTERROLE, APPLY_MANIFESTS, BUILD, DOCKER_PUSH, GENERATE, INSTALL, UNINSTALL, YAML,
};

use crate::fixtures::{run_config, DeployHarness};

/// Given the full build pipeline in sequential mode
/// When it runs with tasks that take measurable time
/// Then no two task processes are ever alive concurrently.
#[tokio::test]
async fn test_sequential_never_overlaps_processes() {
    let harness = DeployHarness::new(run_config(true, true));
    for tool in ["helm", "kubectl", "make"] {
        harness.stubs.install(tool, 0, 0.1);
    }

    let (results, _events) = harness.run().await.unwrap();

    assert_eq!(results.len(), 8);
    // Results arrive in completion order; each task finished before the
    // next one started.
    for pair in results.windows(2) {
        assert!(
            pair[0].finished_at <= pair[1].started_at,
            "{} overlapped {}",
            pair[0].name,
            pair[1].name
        );
    }
}

/// Given several tasks ready at the same time
/// When sequential mode picks the next task
/// Then it follows document order, not readiness or name order.
#[tokio::test]
async fn test_sequential_results_follow_document_order() {
    let harness = DeployHarness::new(run_config(true, true));

    let (results, _events) = harness.run().await.unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        order,
        vec![
            UNINSTALL,
            GENERATE,
            YAML,
            BUILD,
            DOCKER_PUSH,
            INSTALL,
            APPLY_MANIFESTS,
            APPLY_CLUSTERROLE
        ]
    );
}

/// Given a sequential run
/// When the event stream is replayed
/// Then at most one task is in flight at any point.
#[tokio::test]
async fn test_sequential_event_stream_has_one_task_in_flight() {
    let harness = DeployHarness::new(run_config(true, true));

    let (_results, events) = harness.run().await.unwrap();

    let mut in_flight = 0usize;
    for event in &events {
        match event {
            SchedulerEvent::TaskStarted { .. } => {
                in_flight += 1;
                assert_eq!(in_flight, 1, "second task started before first finished");
            }
            SchedulerEvent::TaskFinished { .. } => {
                in_flight -= 1;
            }
            SchedulerEvent::AllComplete => {
                assert_eq!(in_flight, 0);
            }
        }
    }
}
