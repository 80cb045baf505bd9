//! `stratus run`: Bring the application up locally.

use std::path::Path;
use std::time::{Duration, Instant};

use clap::Args;
use stratus_common::config::StratusConfig;
use stratus_compose::graph::startup_order;
use stratus_compose::partial::ConfigurationPartial;
use stratus_compose::writer::{compose_project_name, write_compose_file};
use stratus_deploy::adapters::DockerCli;
use stratus_deploy::cancel::CancelToken;
use stratus_deploy::runtime::ContainerRuntime;

use super::compose::{application_partial, output_dir};
use super::stack::LocalStack;
use super::{ModeArg, load_app};
use crate::output::row;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Environment tier to run.
    #[arg(long, value_enum, default_value = "dev")]
    pub mode: ModeArg,

    /// Do not bind-mount service sources into their containers.
    #[arg(long)]
    pub no_mount: bool,

    /// Run in detached mode (don't wait for Ctrl+C).
    #[arg(short, long)]
    pub detach: bool,
}

/// Executes the `run` command.
///
/// Without `--detach`, waits for Ctrl+C and then stops and removes every
/// started container and the project network.
///
/// # Errors
///
/// Returns an error if the graph cannot be compiled, a component fails
/// to build, pull or start, or teardown fails.
pub fn execute(app_dir: &Path, config: &StratusConfig, args: &RunArgs) -> anyhow::Result<()> {
    let started_at = Instant::now();
    let ctx = load_app(app_dir)?;
    let mode = args.mode.build_mode(args.no_mount);
    let partial = application_partial(&ctx, mode)?;
    let _ = write_compose_file(&output_dir(&ctx, config, mode), &partial)?;
    let order = startup_order(&partial)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let runtime = DockerCli::locate(&config.docker_bin)?;
    let project = compose_project_name(&ctx.dir);
    let stack = LocalStack::up(&runtime, &ctx, &project, &partial, &order, &cancel)?;

    eprintln!();
    eprintln!(
        "  Started {} container(s) on network {project} in {:.1}s",
        stack.container_count(),
        started_at.elapsed().as_secs_f64()
    );
    if let Err(e) = print_containers(&runtime, &partial) {
        tracing::warn!(error = %e, "cannot list containers");
    }

    if args.detach {
        eprintln!();
        eprintln!("  Running detached. The next run replaces these containers.");
        return Ok(());
    }
    eprintln!();
    eprintln!("  Press Ctrl+C to stop all containers...");
    while !cancel.is_cancelled() {
        std::thread::sleep(Duration::from_millis(250));
    }

    eprintln!();
    eprintln!("  Stopping containers...");
    stack.teardown()?;
    eprintln!("  All containers stopped.");
    Ok(())
}

fn print_containers(runtime: &dyn ContainerRuntime, partial: &ConfigurationPartial) -> anyhow::Result<()> {
    let ours: Vec<_> = runtime
        .list_containers()?
        .into_iter()
        .filter(|c| partial.services.values().any(|spec| spec.container_name.as_deref() == Some(c.name.as_str())))
        .collect();
    if ours.is_empty() {
        return Ok(());
    }
    let width = ours.iter().map(|c| c.name.len()).max().unwrap_or_default();
    eprintln!();
    for container in &ours {
        eprintln!("    {}", row(&[&container.name, &container.status], &[width, 0]));
    }
    Ok(())
}
