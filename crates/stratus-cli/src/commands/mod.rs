//! CLI command definitions and dispatch.

pub mod clean;
pub mod compose;
pub mod deploy;
pub mod plan;
pub mod run;
mod stack;
pub mod test;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use stratus_common::config::StratusConfig;
use stratus_common::context::AppContext;
use stratus_common::mode::BuildMode;

/// Stratus: compose and deploy multi-service applications.
#[derive(Parser, Debug)]
#[command(name = "stratus", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Application directory holding `application.yml`.
    #[arg(long, global = true, env = "STRATUS_APP_DIR", default_value = ".")]
    pub app_dir: PathBuf,

    /// Docker CLI binary.
    #[arg(long, global = true, env = "STRATUS_DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    /// Terraform CLI binary.
    #[arg(long, global = true, env = "STRATUS_TERRAFORM_BIN", default_value = "terraform")]
    pub terraform_bin: String,

    /// AWS CLI binary.
    #[arg(long, global = true, env = "STRATUS_AWS_BIN", default_value = "aws")]
    pub aws_bin: String,
}

impl Cli {
    /// Tool configuration with the global flags applied.
    fn config(&self) -> StratusConfig {
        StratusConfig {
            docker_bin: self.docker_bin.clone(),
            terraform_bin: self.terraform_bin.clone(),
            aws_bin: self.aws_bin.clone(),
            ..StratusConfig::default()
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the docker-compose file for a mode.
    Compose(compose::ComposeArgs),
    /// Show the startup order and where each component comes from.
    Plan(plan::PlanArgs),
    /// Bring the application up locally.
    Run(run::RunArgs),
    /// Run every service's test script; fails if any service's tests fail.
    Test(test::TestArgs),
    /// Deploy the application to its remote account.
    Deploy(deploy::DeployArgs),
    /// Remove dangling images and unused volumes.
    Clean(clean::CleanArgs),
}

/// Local build mode selected on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Development tier, sources mounted.
    Dev,
    /// Test tier, sources mounted.
    Test,
    /// Production images.
    Prod,
}

impl ModeArg {
    /// The build mode, with mounting disabled when `no_mount` is set.
    pub const fn build_mode(self, no_mount: bool) -> BuildMode {
        let mode = match self {
            Self::Dev => BuildMode::local_development(),
            Self::Test => BuildMode::local_test(),
            Self::Prod => BuildMode::local_production(),
        };
        if no_mount { mode.with_mount(false) } else { mode }
    }
}

/// Loads the application, reporting the directory on failure.
fn load_app(dir: &Path) -> anyhow::Result<AppContext> {
    AppContext::load(dir).map_err(|e| anyhow::anyhow!("cannot load application in {}: {e}", dir.display()))
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    match cli.command {
        Command::Compose(args) => compose::execute(&cli.app_dir, &config, &args),
        Command::Plan(args) => plan::execute(&cli.app_dir, &args),
        Command::Run(args) => run::execute(&cli.app_dir, &config, &args),
        Command::Test(args) => test::execute(&cli.app_dir, &config, &args),
        Command::Deploy(args) => deploy::execute(&cli.app_dir, config, &args),
        Command::Clean(args) => clean::execute(&config, &args),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_mount_overrides_mode() {
        assert!(ModeArg::Dev.build_mode(false).mount);
        assert!(!ModeArg::Dev.build_mode(true).mount);
        assert_eq!(ModeArg::Prod.build_mode(false).label(), "local-prod");
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from(["stratus", "test", "--no-mount"]).expect("parse");
        let Command::Test(args) = cli.command else {
            panic!("expected test");
        };
        assert!(args.no_mount);
    }

    #[test]
    fn deploy_flags_parse() {
        let cli = Cli::try_parse_from([
            "stratus",
            "--app-dir",
            "/apps/todo",
            "deploy",
            "--auto-approve",
            "--profile",
            "ops",
            "--push-concurrency",
            "2",
        ])
        .expect("parse");
        assert_eq!(cli.app_dir, PathBuf::from("/apps/todo"));
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.auto_approve);
        assert_eq!(args.profile, "ops");
        assert_eq!(args.push_concurrency, 2);
    }
}
