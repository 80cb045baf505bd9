//! Deploy-time validation of the whole application.

use stratus_common::context::AppContext;
use stratus_common::error::Result;

use crate::infra::remote_dependencies;

/// Checks the application, each service, then each remote dependency,
/// stopping at the first problem.
///
/// # Errors
///
/// Returns a validation error naming the offending subject and field.
pub fn validate_for_deploy(app: &AppContext) -> Result<()> {
    app.definition.validate_names()?;
    app.definition.remote.validate_fields()?;
    for role in app.definition.sorted_roles() {
        app.service(role)?.validate_deploy_fields(role)?;
    }
    for dep in remote_dependencies(app) {
        dep.validate()?;
    }
    tracing::debug!(app = %app.name(), "application valid for deploy");
    Ok(())
}
