//! The ordered deployment pipeline.
//!
//! A pipeline is a fixed list of stages run in order over a shared
//! [`DeployContext`]. Each stage prints one progress line before it starts;
//! the first failure stops the run and is reported with its stage.

use std::fmt;
use std::io::Write;

use stratus_common::error::{Result, StratusError};

use crate::account::{CloudAccount, Operator};
use crate::context::DeployContext;
use crate::error::PipelineError;
use crate::infra::InfraTool;
use crate::runtime::ContainerRuntime;
use crate::stages;

/// A step of the deployment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Checks every field a deploy requires.
    Validate,
    /// Ensures the state bucket and lock table exist.
    ProvisionAccount,
    /// Builds or pulls, then publishes, every image.
    PushImages,
    /// Reads the previously generated infra definition.
    ReadPriorInfraState,
    /// Regenerates the infra definition.
    GenerateInfraFiles,
    /// Compares the regenerated definition with the previous one.
    DiffCheckInfraFiles,
    /// Reads the application's secrets.
    RetrieveSecrets,
    /// Initialises remote infra state.
    InitRemoteState,
    /// Applies the infra definition.
    Apply,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Self; 9] = [
        Self::Validate,
        Self::ProvisionAccount,
        Self::PushImages,
        Self::ReadPriorInfraState,
        Self::GenerateInfraFiles,
        Self::DiffCheckInfraFiles,
        Self::RetrieveSecrets,
        Self::InitRemoteState,
        Self::Apply,
    ];

    /// Short machine-friendly name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::ProvisionAccount => "provision-account",
            Self::PushImages => "push-images",
            Self::ReadPriorInfraState => "read-prior-infra-state",
            Self::GenerateInfraFiles => "generate-infra-files",
            Self::DiffCheckInfraFiles => "diff-check-infra-files",
            Self::RetrieveSecrets => "retrieve-secrets",
            Self::InitRemoteState => "init-remote-state",
            Self::Apply => "apply",
        }
    }

    /// Line shown to the operator when the stage starts.
    pub const fn progress(self) -> &'static str {
        match self {
            Self::Validate => "Validating application configuration",
            Self::ProvisionAccount => "Setting up the cloud account",
            Self::PushImages => "Publishing images",
            Self::ReadPriorInfraState => "Retrieving previous infrastructure files",
            Self::GenerateInfraFiles => "Generating infrastructure files",
            Self::DiffCheckInfraFiles => "Checking infrastructure files for changes",
            Self::RetrieveSecrets => "Retrieving secrets",
            Self::InitRemoteState => "Initializing remote state",
            Self::Apply => "Applying infrastructure changes",
        }
    }

    fn run_fn(self) -> StageFn {
        match self {
            Self::Validate => stages::validate,
            Self::ProvisionAccount => stages::provision_account,
            Self::PushImages => stages::push_images,
            Self::ReadPriorInfraState => stages::read_prior_infra_state,
            Self::GenerateInfraFiles => stages::generate_infra_files,
            Self::DiffCheckInfraFiles => stages::diff_check_infra_files,
            Self::RetrieveSecrets => stages::retrieve_secrets,
            Self::InitRemoteState => stages::init_remote_state,
            Self::Apply => stages::apply,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// External systems the stages talk to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Container runtime used to build, pull, tag and push.
    pub runtime: &'a dyn ContainerRuntime,
    /// Infrastructure tool.
    pub infra: &'a dyn InfraTool,
    /// Cloud account and secret store.
    pub account: &'a dyn CloudAccount,
    /// Whoever confirms drift.
    pub operator: &'a dyn Operator,
}

/// Signature shared by every stage body.
pub type StageFn = fn(&mut DeployContext, &Collaborators<'_>, &mut dyn Write) -> Result<()>;

/// An ordered list of stages.
pub struct Pipeline {
    stages: Vec<(Stage, StageFn)>,
}

impl Pipeline {
    /// The full deploy, in its fixed order.
    pub fn standard() -> Self {
        Self::from_stages(Stage::ALL.iter().map(|stage| (*stage, stage.run_fn())))
    }

    /// A pipeline with custom stage bodies, run in the given order.
    pub fn from_stages(stages: impl IntoIterator<Item = (Stage, StageFn)>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
        }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> Vec<Stage> {
        self.stages.iter().map(|(stage, _)| *stage).collect()
    }

    /// Runs every stage in order, stopping at the first failure.
    ///
    /// Cancellation is checked before each stage; a cancelled run reports
    /// the stage it would have started.
    ///
    /// # Errors
    ///
    /// Returns the first failure, tagged with its stage.
    pub fn run(
        &self,
        ctx: &mut DeployContext,
        collaborators: &Collaborators<'_>,
        out: &mut dyn Write,
    ) -> std::result::Result<(), PipelineError> {
        for (stage, body) in &self.stages {
            let stage = *stage;
            if ctx.cancel.is_cancelled() {
                tracing::warn!(stage = %stage, "deploy cancelled");
                return Err(PipelineError::new(stage, StratusError::Cancelled));
            }
            writeln!(out, "{}...", stage.progress())
                .map_err(|e| PipelineError::new(stage, StratusError::io("<stdout>", e)))?;
            tracing::info!(stage = %stage, "stage started");
            body(ctx, collaborators, out).map_err(|source| {
                tracing::error!(stage = %stage, error = %source, "stage failed");
                PipelineError::new(stage, source)
            })?;
            tracing::debug!(stage = %stage, "stage finished");
        }
        tracing::info!(app = %ctx.app.name(), "deploy finished");
        Ok(())
    }
}
