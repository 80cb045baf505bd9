//! Bodies of the standard pipeline stages.

use std::io::Write;

use stratus_common::error::{Result, StratusError};

use crate::context::DeployContext;
use crate::drift::DriftOutcome;
use crate::images::{PublishTarget, image_jobs, publish_images};
use crate::infra::InfraDefinition;
use crate::pipeline::Collaborators;
use crate::validate::validate_for_deploy;
use crate::varflags::compile_var_flags;

fn emit(out: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(out, "{line}").map_err(|e| StratusError::io("<stdout>", e))
}

pub fn validate(ctx: &mut DeployContext, _: &Collaborators<'_>, _: &mut dyn Write) -> Result<()> {
    validate_for_deploy(&ctx.app)
}

pub fn provision_account(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    _: &mut dyn Write,
) -> Result<()> {
    collaborators.account.ensure_account(&ctx.account)
}

pub fn push_images(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    out: &mut dyn Write,
) -> Result<()> {
    let registry = collaborators.account.registry_login(&ctx.account)?;
    let jobs = image_jobs(&ctx.app)?;
    let target = PublishTarget {
        account: &ctx.account,
        registry: &registry,
        runtime: collaborators.runtime,
        cloud: collaborators.account,
    };
    let images = publish_images(jobs, target, ctx.push_concurrency, &ctx.cancel)?;
    for (name, reference) in &images {
        emit(out, &format!("  {name}: {reference}"))?;
    }
    ctx.images = Some(images);
    Ok(())
}

pub fn read_prior_infra_state(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    _: &mut dyn Write,
) -> Result<()> {
    ctx.previous_infra = collaborators.infra.read_existing_definition(&ctx.infra_dir)?;
    Ok(())
}

pub fn generate_infra_files(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    _: &mut dyn Write,
) -> Result<()> {
    let definition = InfraDefinition::build(&ctx.app, &ctx.account, ctx.images()?)?;
    let text = collaborators.infra.write_definition(&ctx.infra_dir, &definition)?;
    ctx.generated_infra = Some(text);
    Ok(())
}

pub fn diff_check_infra_files(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    out: &mut dyn Write,
) -> Result<()> {
    let generated = ctx.generated_infra.as_deref().ok_or_else(|| StratusError::Resolution {
        dependency: "infrastructure files".into(),
        message: "not generated yet".into(),
    })?;
    let outcome = DriftOutcome::compare(ctx.previous_infra.as_deref(), generated);
    let summary = match &outcome {
        DriftOutcome::NoPrior => return emit(out, "  no previous infrastructure files"),
        DriftOutcome::Unchanged { digest } => {
            tracing::debug!(digest = %digest, "infrastructure files unchanged");
            return emit(out, "  infrastructure files unchanged");
        }
        DriftOutcome::Changed { diff, .. } => {
            emit(out, diff)?;
            outcome.summary().unwrap_or_default()
        }
    };
    if ctx.auto_approve {
        tracing::warn!(changes = %summary, "infrastructure files changed, continuing");
        return Ok(());
    }
    let accepted = collaborators
        .operator
        .confirm("The infrastructure files changed. Do you want to continue?")?;
    if accepted {
        Ok(())
    } else {
        Err(StratusError::DriftDetected { summary })
    }
}

pub fn retrieve_secrets(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    _: &mut dyn Write,
) -> Result<()> {
    let secrets = collaborators.account.read_secrets(&ctx.account)?;
    tracing::debug!(count = secrets.len(), "secrets retrieved");
    ctx.secrets = Some(secrets);
    Ok(())
}

pub fn init_remote_state(
    ctx: &mut DeployContext,
    collaborators: &Collaborators<'_>,
    _: &mut dyn Write,
) -> Result<()> {
    collaborators.infra.init(&ctx.infra_dir, &ctx.account)
}

pub fn apply(ctx: &mut DeployContext, collaborators: &Collaborators<'_>, _: &mut dyn Write) -> Result<()> {
    let flags = compile_var_flags(ctx)?;
    collaborators
        .infra
        .apply(&ctx.infra_dir, &flags, ctx.auto_approve, &ctx.cancel)
}
