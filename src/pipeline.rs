//! The chaos-mesh deployment plan.
//!
//! Builds the fixed task list the orchestrator executes: uninstall the old
//! release, optionally regenerate and rebuild images, install the chart,
//! then apply manifests. All helm/kubectl/make argv construction lives
//! here; nothing else in the crate knows the command shapes.

use crate::config::RunConfig;
use crate::core::graph::TaskGraph;
use crate::core::task::Task;
use crate::error::Result;

/// Namespace the release is installed into.
pub const NAMESPACE: &str = "chaos-testing";
/// Helm release name.
pub const RELEASE: &str = "chaos-mesh";
/// Chart path relative to the repository root.
pub const CHART_PATH: &str = "helm/chaos-mesh";
/// Runtime settings passed to the chart on kind clusters, where the
/// container runtime is containerd rather than the chart's default.
const CONTAINERD_RUNTIME: &str = "chaosDaemon.runtime=containerd";
const CONTAINERD_SOCKET: &str = "chaosDaemon.socketPath=/run/containerd/containerd.sock";
/// Chart setting that enables the dashboard.
const DASHBOARD_CREATE: &str = "dashboard.create=true";

/// Task names, in document order.
pub const UNINSTALL: &str = "uninstall";
pub const GENERATE: &str = "generate";
pub const YAML: &str = "yaml";
pub const BUILD: &str = "build";
pub const DOCKER_PUSH: &str = "docker-push";
pub const INSTALL: &str = "install";
pub const APPLY_MANIFESTS: &str = "apply-manifests";
pub const APPLY_CLUSTERROLE: &str = "apply-clusterrole";

/// Build the deployment task list for the given configuration.
///
/// With `build_images` off the plan is the four-task chain
/// uninstall, install, apply-manifests, apply-clusterrole; with it on, the
/// make targets (generate, yaml, build, docker-push) are inserted and
/// install additionally waits for the pushed images. `kind_cluster`
/// selects the containerd runtime settings on install.
pub fn build_plan(config: &RunConfig, kind_cluster: bool) -> Vec<Task> {
    let mut tasks = vec![uninstall_task()];

    if config.build_images {
        tasks.push(Task::new(GENERATE, ["make", "generate"]));
        tasks.push(Task::new(YAML, ["make", "yaml"]));
        tasks.push(build_task(config));
        tasks.push(Task::new(DOCKER_PUSH, ["make", "docker-push"]).with_deps([BUILD]));
    }

    tasks.push(install_task(config, kind_cluster));
    tasks.push(Task::new(APPLY_MANIFESTS, ["kubectl", "apply", "-f", "manifests/"]).with_deps([INSTALL]));
    tasks.push(
        Task::new(APPLY_CLUSTERROLE, ["kubectl", "apply", "-f", "clusterrole.yaml"])
            .with_deps([APPLY_MANIFESTS]),
    );

    tasks
}

/// Build the plan and wire it into a task graph.
pub fn build_graph(config: &RunConfig, kind_cluster: bool) -> Result<TaskGraph> {
    TaskGraph::from_tasks(build_plan(config, kind_cluster))
}

fn uninstall_task() -> Task {
    Task::new(
        UNINSTALL,
        ["helm", "uninstall", &format!("--namespace={}", NAMESPACE), RELEASE],
    )
}

fn build_task(config: &RunConfig) -> Task {
    // Bare `make`: the default target builds the images. The Makefile reads
    // UI to decide whether the dashboard frontend is packaged; the flag
    // travels on the child environment only.
    let mut task = Task::new(BUILD, ["make"]).with_deps([GENERATE, YAML]);
    if config.ui {
        task = task.with_env("UI", "1");
    }
    task
}

fn install_task(config: &RunConfig, kind_cluster: bool) -> Task {
    let mut command: Vec<String> = [
        "helm",
        "install",
        RELEASE,
        CHART_PATH,
        &format!("--namespace={}", NAMESPACE),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if kind_cluster {
        command.extend([
            "--set".to_string(),
            CONTAINERD_RUNTIME.to_string(),
            "--set".to_string(),
            CONTAINERD_SOCKET.to_string(),
        ]);
    }

    if config.ui {
        command.extend(["--set".to_string(), DASHBOARD_CREATE.to_string()]);
    }

    let mut deps = vec![UNINSTALL.to_string()];
    if config.build_images {
        deps.push(DOCKER_PUSH.to_string());
    }

    Task::new(INSTALL, command)
        .with_deps(deps)
        .with_pre_command(["kubectl", "create", "ns", NAMESPACE])
}
