//! State threaded through the deployment pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use stratus_common::context::{AppContext, Secrets};
use stratus_common::error::{Result, StratusError};

use crate::cancel::CancelToken;

/// Table used to lock the remote infra state.
pub const LOCK_TABLE: &str = "TerraformLocks";

/// Coordinates of the cloud account an application deploys into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAccount {
    /// Named credentials profile.
    pub profile: String,
    /// Cloud region.
    pub region: String,
    /// Account identifier.
    pub account_id: String,
    /// Application name, used to derive per-app resource names.
    pub app_name: String,
}

impl RemoteAccount {
    /// Derives the account from an application definition and a profile.
    pub fn for_app(app: &AppContext, profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            region: app.definition.remote.region.clone(),
            account_id: app.definition.remote.account_id.clone(),
            app_name: app.name().to_string(),
        }
    }

    /// Bucket holding the remote infra state.
    pub fn state_bucket(&self) -> String {
        format!("{}-{}-terraform", self.account_id, self.app_name)
    }

    /// Hostname of the account's image registry.
    pub fn registry(&self) -> String {
        format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
    }

    /// Identifier of the secret holding the application's secrets.
    pub fn secret_id(&self) -> String {
        format!("{}-secrets", self.app_name)
    }
}

/// Published image references keyed by service role or dependency name.
pub type ImageMap = BTreeMap<String, String>;

/// Everything the pipeline stages read and enrich.
///
/// The optional fields are each written once, by a single stage, and are
/// read-only afterwards.
#[derive(Debug)]
pub struct DeployContext {
    /// The application being deployed.
    pub app: AppContext,
    /// Target account.
    pub account: RemoteAccount,
    /// Directory holding the generated infra definition.
    pub infra_dir: PathBuf,
    /// Whether drift and apply proceed without operator confirmation.
    pub auto_approve: bool,
    /// Maximum number of images published concurrently.
    pub push_concurrency: usize,
    /// External cancellation signal.
    pub cancel: CancelToken,
    /// Secrets, set by `RetrieveSecrets`.
    pub secrets: Option<Secrets>,
    /// Published images, set by `PushImages`.
    pub images: Option<ImageMap>,
    /// Previously generated infra definition, set by `ReadPriorInfraState`.
    pub previous_infra: Option<String>,
    /// Freshly generated infra definition, set by `GenerateInfraFiles`.
    pub generated_infra: Option<String>,
}

impl DeployContext {
    /// Creates a context with nothing computed yet. `auto_approve` is
    /// always an explicit choice of the caller.
    pub fn new(app: AppContext, account: RemoteAccount, infra_dir: PathBuf, auto_approve: bool) -> Self {
        Self {
            app,
            account,
            infra_dir,
            auto_approve,
            push_concurrency: stratus_common::constants::DEFAULT_PUSH_CONCURRENCY,
            cancel: CancelToken::new(),
            secrets: None,
            images: None,
            previous_infra: None,
            generated_infra: None,
        }
    }

    /// Secrets retrieved earlier in the run.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if secrets have not been retrieved yet.
    pub fn secrets(&self) -> Result<&Secrets> {
        self.secrets.as_ref().ok_or_else(|| not_ready("secrets"))
    }

    /// Images published earlier in the run.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if images have not been published yet.
    pub fn images(&self) -> Result<&ImageMap> {
        self.images.as_ref().ok_or_else(|| not_ready("images"))
    }
}

fn not_ready(what: &str) -> StratusError {
    StratusError::Resolution {
        dependency: what.to_string(),
        message: "not available yet at this stage of the deploy".into(),
    }
}

#[cfg(test)]
mod tests {
    use stratus_common::app::ApplicationDefinition;

    use super::*;

    fn account() -> RemoteAccount {
        RemoteAccount {
            profile: "default".into(),
            region: "us-west-2".into(),
            account_id: "12345".into(),
            app_name: "todo-app".into(),
        }
    }

    #[test]
    fn derived_names() {
        let account = account();
        assert_eq!(account.state_bucket(), "12345-todo-app-terraform");
        assert_eq!(account.registry(), "12345.dkr.ecr.us-west-2.amazonaws.com");
        assert_eq!(account.secret_id(), "todo-app-secrets");
    }

    #[test]
    fn accessors_fail_before_stage_ran() {
        let app = AppContext::from_parts("/x", ApplicationDefinition::default(), BTreeMap::new());
        let ctx = DeployContext::new(app, account(), PathBuf::from("/x/terraform"), false);
        assert!(ctx.secrets().is_err());
        assert!(ctx.images().is_err());
        assert!(!ctx.auto_approve);
    }
}
