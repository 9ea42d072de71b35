//! Full pipeline execution tests.
//!
//! Each test runs the real plan through the real scheduler against stub
//! tools and asserts on the exact commands invoked.

use chaosup::config::RunConfig;
use chaosup::orchestration::SchedulerEvent;
use chaosup::pipeline::{APPLY_CLUSTERROLE, DOCKER_PUSH, INSTALL, UNINSTALL};
use chaosup::report::{RunId, RunReport};

use crate::fixtures::{result_of, run_config, DeployHarness};

/// Given a full build-and-deploy run in sequential mode
/// When the pipeline executes
/// Then every command runs exactly once, in document order.
#[tokio::test]
async fn test_full_deploy_runs_every_command_in_document_order() {
    let harness = DeployHarness::new(run_config(true, true));

    let (results, _events) = harness.run().await.unwrap();

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.succeeded));
    assert_eq!(
        harness.stubs.invocations(),
        vec![
            "helm uninstall --namespace=chaos-testing chaos-mesh",
            "make generate",
            "make yaml",
            "make",
            "make docker-push",
            "kubectl create ns chaos-testing",
            "helm install chaos-mesh helm/chaos-mesh --namespace=chaos-testing",
            "kubectl apply -f manifests/",
            "kubectl apply -f clusterrole.yaml",
        ]
    );
}

/// Given a run without image building
/// When the pipeline executes
/// Then only uninstall, install, and the applies run; make is never invoked.
#[tokio::test]
async fn test_no_build_deploy_skips_make_entirely() {
    let harness = DeployHarness::new(run_config(false, true));

    let (results, _events) = harness.run().await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.succeeded));
    let invocations = harness.stubs.invocations();
    assert_eq!(
        invocations,
        vec![
            "helm uninstall --namespace=chaos-testing chaos-mesh",
            "kubectl create ns chaos-testing",
            "helm install chaos-mesh helm/chaos-mesh --namespace=chaos-testing",
            "kubectl apply -f manifests/",
            "kubectl apply -f clusterrole.yaml",
        ]
    );
    assert!(invocations.iter().all(|line| !line.starts_with("make")));
}

/// Given the active context is a kind cluster
/// When install runs
/// Then the chart gets the containerd runtime settings.
#[tokio::test]
async fn test_kind_cluster_adds_containerd_settings() {
    let harness = DeployHarness::new(run_config(false, true)).on_kind_cluster();

    harness.run().await.unwrap();

    let invocations = harness.stubs.invocations();
    let install = invocations
        .iter()
        .find(|line| line.starts_with("helm install"))
        .expect("install was not invoked");
    assert_eq!(
        install,
        "helm install chaos-mesh helm/chaos-mesh --namespace=chaos-testing \
         --set chaosDaemon.runtime=containerd \
         --set chaosDaemon.socketPath=/run/containerd/containerd.sock"
    );
}

/// Given a UI deployment with image building
/// When the pipeline executes
/// Then the chart enables the dashboard, the build task's child sees UI=1,
/// the other make targets do not, and the orchestrator's own environment
/// is never touched.
#[tokio::test]
async fn test_ui_deploy_sets_dashboard_and_scopes_build_env() {
    let config = RunConfig {
        ui: true,
        ..run_config(true, true)
    };
    let harness = DeployHarness::new(config);
    harness.stubs.record_make_ui_env();

    harness.run().await.unwrap();

    let invocations = harness.stubs.invocations();
    assert!(invocations.contains(&"make UI=1".to_string()));
    assert!(invocations.contains(&"make generate UI=".to_string()));
    assert!(invocations.contains(&"make yaml UI=".to_string()));
    assert!(invocations.contains(&"make docker-push UI=".to_string()));

    let install = invocations
        .iter()
        .find(|line| line.starts_with("helm install"))
        .expect("install was not invoked");
    assert!(install.ends_with("--set dashboard.create=true"));

    assert!(std::env::var("UI").is_err());
}

/// Given the chaos-testing namespace already exists
/// When install's namespace precondition fails
/// Then install itself still runs and succeeds.
#[tokio::test]
async fn test_namespace_ensure_failure_does_not_fail_install() {
    let harness = DeployHarness::new(run_config(false, true));
    harness.stubs.kubectl_namespace_exists();

    let (results, _events) = harness.run().await.unwrap();

    assert!(result_of(&results, INSTALL).succeeded);
    assert!(results.iter().all(|r| r.succeeded));
    assert!(harness
        .stubs
        .invocations()
        .contains(&"kubectl create ns chaos-testing".to_string()));
}

/// Given any completed run
/// When the event stream is inspected
/// Then every task produced a start and a finish, and AllComplete came last.
#[tokio::test]
async fn test_events_mirror_the_run() {
    let harness = DeployHarness::new(run_config(false, true));

    let (results, events) = harness.run().await.unwrap();

    let started = events
        .iter()
        .filter(|e| matches!(e, SchedulerEvent::TaskStarted { .. }))
        .count();
    let finished = events
        .iter()
        .filter(|e| matches!(e, SchedulerEvent::TaskFinished { .. }))
        .count();
    assert_eq!(started, results.len());
    assert_eq!(finished, results.len());
    assert_eq!(events.last(), Some(&SchedulerEvent::AllComplete));

    assert!(matches!(
        &events[0],
        SchedulerEvent::TaskStarted { name } if name == UNINSTALL
    ));
}

/// Given a completed run
/// When a report is assembled from the results
/// Then it reflects the outcome of every task.
#[tokio::test]
async fn test_report_assembled_from_run() {
    let harness = DeployHarness::new(run_config(true, false));
    harness.stubs.fail_subcommand("make", DOCKER_PUSH, 2);

    let started_at = chrono::Utc::now();
    let (results, _events) = harness.run().await.unwrap();

    let report = RunReport {
        run_id: RunId::new(),
        context: "kind-kind".to_string(),
        config: harness.config.clone(),
        started_at,
        finished_at: chrono::Utc::now(),
        results,
    };

    assert_eq!(report.results.len(), 8);
    assert!(!report.succeeded());
    assert_eq!(report.failed_count(), 1);
    assert!(result_of(&report.results, APPLY_CLUSTERROLE).succeeded);
}
