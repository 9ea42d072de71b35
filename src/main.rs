use clap::Parser;
use tokio::sync::mpsc;

use chaosup::cluster;
use chaosup::config::{Config, RunConfig, Verbosity};
use chaosup::core::TaskGraph;
use chaosup::orchestration::{CommandRunner, Scheduler, SchedulerEvent};
use chaosup::pipeline;
use chaosup::report::{RunId, RunReport};
use chaosup::{clog, clog_trace, clog_warn, Result};

/// Chaosup - chaos-mesh deployment orchestrator
#[derive(Parser, Debug)]
#[command(name = "chaosup")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    CHAOSUP_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Deploy the dashboard (and bundle its frontend when building images)
    #[arg(long)]
    pub ui: bool,

    /// Regenerate, rebuild, and push images before installing
    #[arg(long)]
    pub build_images: bool,

    /// Run one task at a time in document order
    #[arg(short = 's', long)]
    pub sequential: bool,

    /// Console verbosity: 0 silent, 1 errors, 2 progress, 3 full output
    #[arg(short = 'v', long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=3))]
    pub verbose_level: Option<u8>,

    /// Keep running remaining tasks after one fails
    #[arg(long, value_name = "BOOL")]
    pub continue_on_failure: Option<bool>,

    /// Print the plan and exit without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging (writes to ~/.chaosup/chaosup.log)
    #[arg(short = 'd', long)]
    pub debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    chaosup::log::init_with_debug(cli.debug);
    clog!("Chaosup starting");

    let file_config = Config::load()?;
    let config = resolve_run_config(&cli, &file_config);
    clog!(
        "Run config: sequential={}, build_images={}, ui={}, verbosity={}, continue_on_failure={}",
        config.sequential,
        config.build_images,
        config.ui,
        config.verbosity.level(),
        config.continue_on_failure
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_deploy(config, cli.dry_run))
}

/// Layer CLI flags over the optional config file.
///
/// Boolean flags can only enable behavior, so a flag given on the command
/// line or set in the file wins. Valued options take the CLI value first,
/// then the file, then the default.
fn resolve_run_config(cli: &Cli, file: &Config) -> RunConfig {
    RunConfig {
        sequential: cli.sequential || file.sequential,
        build_images: cli.build_images || file.build_images,
        ui: cli.ui || file.ui,
        verbosity: Verbosity::from_level(
            cli.verbose_level
                .or(file.verbose_level)
                .unwrap_or(Verbosity::default().level()),
        ),
        continue_on_failure: cli
            .continue_on_failure
            .or(file.continue_on_failure)
            .unwrap_or(true),
    }
}

/// Run the deployment pipeline end to end.
///
/// Tasks that fail are recorded in the run report without failing the
/// deployment; only internal faults (missing tools, no cluster context,
/// spawn failures) or an abort with `--continue-on-failure false` surface
/// as errors.
async fn run_deploy(config: RunConfig, dry_run: bool) -> Result<()> {
    cluster::preflight(config.build_images)?;

    let context = cluster::current_context().await?;
    let kind_cluster = cluster::is_kind_context(&context);
    clog!("Deploying to context '{}' (kind={})", context, kind_cluster);

    let graph = pipeline::build_graph(&config, kind_cluster)?;

    if dry_run {
        return print_plan(&graph, &context);
    }

    if config.verbosity.progress() {
        println!(
            "Deploying chaos-mesh to '{}' ({} tasks{})",
            context,
            graph.task_count(),
            if config.sequential { ", sequential" } else { "" }
        );
    }

    let run_id = RunId::new();
    let started_at = chrono::Utc::now();

    // The scheduler prints progress itself; events just feed the trace log.
    let (event_tx, mut event_rx) = mpsc::channel::<SchedulerEvent>(64);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            clog_trace!("Scheduler event: {:?}", event);
        }
    });

    let runner = CommandRunner::new(config.verbosity);
    let mut scheduler = Scheduler::new(graph, runner, config.clone(), event_tx);
    let results = scheduler.run().await?;

    let report = RunReport {
        run_id,
        context,
        config,
        started_at,
        finished_at: chrono::Utc::now(),
        results,
    };

    if report.config.verbosity.progress() {
        report.print_summary();
    }
    if let Err(e) = report.save() {
        clog_warn!("Failed to save run report: {}", e);
    }

    clog!(
        "Deployment finished: {} tasks, {} failed",
        report.results.len(),
        report.failed_count()
    );
    Ok(())
}

/// Print the plan in execution order without running anything.
fn print_plan(graph: &TaskGraph, context: &str) -> Result<()> {
    println!("Plan for context '{}' ({} tasks):", context, graph.task_count());
    for task in graph.topological_order()? {
        println!("  {:<18} {}", task.name, task.command_line());
        if let Some(pre) = &task.pre_command {
            println!("  {:<18} (first: {})", "", pre.join(" "));
        }
    }
    Ok(())
}
