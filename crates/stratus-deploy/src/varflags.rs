//! `-var` flags handed to the infra tool on apply.

use stratus_common::context::{AppContext, Secrets};
use stratus_common::error::Result;
use stratus_common::mode::BuildMode;
use stratus_compose::endpoints::ServiceEndpoints;
use stratus_compose::env::{compile_deploy_env, encode_env_var_string};

use crate::context::DeployContext;
use crate::infra::remote_dependencies;

/// Compiles the flags for an apply, as `-var`, `name=value` pairs.
///
/// Order: secrets, image references, service environments, dependency
/// variables, then the credentials profile.
///
/// # Errors
///
/// Returns an error if secrets or images are not available yet, a
/// required secret is missing, or an environment cannot be encoded.
pub fn compile_var_flags(ctx: &DeployContext) -> Result<Vec<String>> {
    let secrets = ctx.secrets()?;
    let images = ctx.images()?;
    let app = &ctx.app;

    let mut flags = Vec::new();
    for (key, value) in secrets {
        push_var(&mut flags, key, value);
    }
    for (name, reference) in images {
        push_var(&mut flags, &format!("{name}_docker_image"), reference);
    }
    service_env_flags(app, secrets, &mut flags)?;
    for dep in remote_dependencies(app) {
        let encoded = encode_env_var_string(&dep.deployment_variables()?)?;
        push_var(&mut flags, &format!("{}_env_vars", dep.name()), &encoded);
    }
    push_var(&mut flags, "aws_profile", &ctx.account.profile);
    Ok(flags)
}

fn service_env_flags(app: &AppContext, secrets: &Secrets, flags: &mut Vec<String>) -> Result<()> {
    let endpoints = ServiceEndpoints::new(app, BuildMode::deploy_production());
    for role in app.definition.sorted_roles() {
        let env = compile_deploy_env(app, role, &endpoints, secrets)?;
        push_var(flags, &format!("{role}_env_vars"), &encode_env_var_string(&env)?);
    }
    Ok(())
}

fn push_var(flags: &mut Vec<String>, name: &str, value: &str) {
    flags.push("-var".to_string());
    flags.push(format!("{name}={value}"));
}
