//! `stratus deploy`: Deploy the application to its remote account.

use std::path::Path;

use clap::Args;
use dialoguer::Confirm;
use stratus_common::config::StratusConfig;
use stratus_common::error::{Result, StratusError};
use stratus_deploy::account::Operator;
use stratus_deploy::adapters::{AwsCli, DockerCli, TerraformCli};
use stratus_deploy::context::{DeployContext, RemoteAccount};
use stratus_deploy::pipeline::{Collaborators, Pipeline};

use super::load_app;

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Apply infrastructure changes without asking for confirmation.
    #[arg(long)]
    pub auto_approve: bool,

    /// AWS named profile used for every remote call.
    #[arg(long, env = "STRATUS_AWS_PROFILE", default_value = "default")]
    pub profile: String,

    /// Maximum number of images published concurrently.
    #[arg(long, env = "STRATUS_PUSH_CONCURRENCY", default_value_t = stratus_common::constants::DEFAULT_PUSH_CONCURRENCY)]
    pub push_concurrency: usize,
}

/// Asks the operator on the terminal.
struct TerminalOperator;

impl Operator for TerminalOperator {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| StratusError::tool("terminal", e.to_string()))
    }
}

/// Executes the `deploy` command.
///
/// # Errors
///
/// Returns an error if a required tool is missing or any pipeline stage
/// fails; the error names the stage.
pub fn execute(app_dir: &Path, mut config: StratusConfig, args: &DeployArgs) -> anyhow::Result<()> {
    config.aws_profile.clone_from(&args.profile);
    config.push_concurrency = args.push_concurrency.max(1);

    let app = load_app(app_dir)?;
    let account = RemoteAccount::for_app(&app, &config.aws_profile);
    let infra_dir = app.dir.join(&config.infra_dir);
    let mut ctx = DeployContext::new(app, account, infra_dir, args.auto_approve);
    ctx.push_concurrency = config.push_concurrency;

    let on_interrupt = ctx.cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let docker = DockerCli::locate(&config.docker_bin)?;
    let terraform = TerraformCli::locate(&config.terraform_bin)?;
    let aws = AwsCli::locate(&config.aws_bin, docker.clone())?;
    let collaborators = Collaborators {
        runtime: &docker,
        infra: &terraform,
        account: &aws,
        operator: &TerminalOperator,
    };

    println!("Deploying {} to account {}", ctx.app.name(), ctx.account.account_id);
    let mut stdout = std::io::stdout().lock();
    Pipeline::standard().run(&mut ctx, &collaborators, &mut stdout)?;
    drop(stdout);
    println!("Deploy complete.");
    Ok(())
}
