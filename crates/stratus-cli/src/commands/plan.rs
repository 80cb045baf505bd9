//! `stratus plan`: Show the startup order of the local graph.

use std::path::Path;

use clap::Args;
use stratus_compose::builder::component_sources;
use stratus_compose::graph::startup_order;

use super::compose::application_partial;
use super::{ModeArg, load_app};
use crate::output::rule;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Environment tier to compile.
    #[arg(long, value_enum, default_value = "dev")]
    pub mode: ModeArg,
}

/// Executes the `plan` command.
///
/// Compiles the graph, resolves its startup order, and prints each
/// component with its image or build source.
///
/// # Errors
///
/// Returns an error if compilation fails or the graph has a cycle or an
/// undefined reference.
pub fn execute(app_dir: &Path, args: &PlanArgs) -> anyhow::Result<()> {
    let ctx = load_app(app_dir)?;
    let mode = args.mode.build_mode(false);
    let partial = application_partial(&ctx, mode)?;
    let order = startup_order(&partial)?;
    let sources = component_sources(&partial);

    let title = format!("Startup plan for {} ({mode})", ctx.name());
    println!("{title}");
    println!("{}", rule(title.chars().count()));
    println!();
    for name in &order {
        println!("  + {name}");
        if let Some(source) = sources.get(name.as_str()) {
            println!("      {source}");
        }
        if let Some(spec) = partial.services.get(name) {
            if !spec.depends_on.is_empty() {
                println!("      after: {}", spec.depends_on.join(", "));
            }
        }
    }
    println!();
    println!("  {} component(s) will be started.", order.len());
    Ok(())
}
