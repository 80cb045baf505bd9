//! `stratus compose`: Write the docker-compose file for a mode.

use std::path::{Path, PathBuf};

use clap::Args;
use stratus_common::config::StratusConfig;
use stratus_common::context::AppContext;
use stratus_common::mode::BuildMode;
use stratus_compose::builder::ComposeBuilder;
use stratus_compose::partial::ConfigurationPartial;
use stratus_compose::writer::write_compose_file;

use super::{ModeArg, load_app};

/// Arguments for the `compose` command.
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Environment tier to compile.
    #[arg(long, value_enum, default_value = "dev")]
    pub mode: ModeArg,

    /// Do not bind-mount service sources into their containers.
    #[arg(long)]
    pub no_mount: bool,
}

/// Compiles the whole application graph for `mode`.
pub fn application_partial(ctx: &AppContext, mode: BuildMode) -> anyhow::Result<ConfigurationPartial> {
    ComposeBuilder::new(ctx, mode)
        .application_partial()
        .map_err(|e| anyhow::anyhow!("cannot compile {mode} graph: {e}"))
}

/// Directory receiving the compose file for `mode`.
pub fn output_dir(ctx: &AppContext, config: &StratusConfig, mode: BuildMode) -> PathBuf {
    ctx.dir.join(&config.artifact_dir).join(mode.label())
}

/// Executes the `compose` command.
///
/// # Errors
///
/// Returns an error if the application cannot be loaded or compiled, or
/// the file cannot be written.
pub fn execute(app_dir: &Path, config: &StratusConfig, args: &ComposeArgs) -> anyhow::Result<()> {
    let ctx = load_app(app_dir)?;
    let mode = args.mode.build_mode(args.no_mount);
    let partial = application_partial(&ctx, mode)?;
    let path = write_compose_file(&output_dir(&ctx, config, mode), &partial)?;

    println!("Wrote {} component(s) to {}", partial.services.len(), path.display());
    Ok(())
}
