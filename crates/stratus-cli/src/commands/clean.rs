//! `stratus clean`: Remove dangling images and unused volumes.

use clap::Args;
use stratus_common::config::StratusConfig;
use stratus_deploy::adapters::DockerCli;
use stratus_deploy::runtime::ContainerRuntime;

/// Arguments for the `clean` command.
#[derive(Args, Debug)]
pub struct CleanArgs {}

/// Executes the `clean` command.
///
/// # Errors
///
/// Returns an error if docker cannot be found or pruning fails.
pub fn execute(config: &StratusConfig, _args: &CleanArgs) -> anyhow::Result<()> {
    let runtime = DockerCli::locate(&config.docker_bin)?;
    let before = runtime.list_images()?.len();
    runtime.prune()?;
    let after = runtime.list_images()?.len();
    println!("Removed {} dangling image(s) and unused volumes.", before.saturating_sub(after));
    Ok(())
}
