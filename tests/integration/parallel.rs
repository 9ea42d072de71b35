//! Concurrency correctness tests.
//!
//! In the default concurrent mode, independent tasks overlap and joins
//! happen only where the graph demands them.

use chaosup::pipeline::{APPLY_MANIFESTS, BUILD, GENERATE, INSTALL, UNINSTALL, YAML};

use crate::fixtures::{result_of, run_config, DeployHarness};

/// Given the build pipeline in concurrent mode
/// When generate and yaml run
/// Then both are launched before either is joined, and build starts only
/// after both have finished.
#[tokio::test]
async fn test_generate_and_yaml_overlap_before_build() {
    let harness = DeployHarness::new(run_config(true, false));
    harness.stubs.install("make", 0, 0.3);

    let (results, _events) = harness.run().await.unwrap();

    let generate = result_of(&results, GENERATE);
    let yaml = result_of(&results, YAML);
    let build = result_of(&results, BUILD);

    assert!(generate.started_at < yaml.finished_at);
    assert!(yaml.started_at < generate.finished_at);

    assert!(build.started_at >= generate.finished_at);
    assert!(build.started_at >= yaml.finished_at);
}

/// Given the three root tasks
/// When the run starts
/// Then uninstall overlaps the make targets instead of gating them.
#[tokio::test]
async fn test_uninstall_overlaps_the_make_targets() {
    let harness = DeployHarness::new(run_config(true, false));
    harness.stubs.install("helm", 0, 0.2);
    harness.stubs.install("make", 0, 0.2);

    let (results, _events) = harness.run().await.unwrap();

    let uninstall = result_of(&results, UNINSTALL);
    let generate = result_of(&results, GENERATE);

    assert!(uninstall.started_at < generate.finished_at);
    assert!(generate.started_at < uninstall.finished_at);
}

/// Given every combination of build and sequential flags
/// When the pipeline runs
/// Then apply-manifests starts strictly after install finished.
#[tokio::test]
async fn test_apply_manifests_after_install_in_every_mode() {
    for build_images in [false, true] {
        for sequential in [false, true] {
            let harness = DeployHarness::new(run_config(build_images, sequential));

            let (results, _events) = harness.run().await.unwrap();

            let install = result_of(&results, INSTALL);
            let apply = result_of(&results, APPLY_MANIFESTS);
            assert!(
                install.finished_at <= apply.started_at,
                "apply-manifests overlapped install (build={}, sequential={})",
                build_images,
                sequential
            );
        }
    }
}

/// Given a concurrent full-build run
/// When it finishes
/// Then every task was awaited and produced a result.
#[tokio::test]
async fn test_concurrent_run_joins_every_task() {
    let harness = DeployHarness::new(run_config(true, false));

    let (results, _events) = harness.run().await.unwrap();

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.succeeded));
    // Nine invocations: eight tasks plus install's namespace precondition
    assert_eq!(harness.stubs.invocations().len(), 9);
}
