//! Tool-level configuration for the Stratus CLI and pipeline.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Settings that control how Stratus talks to its external tools.
///
/// Every field has a default; the CLI overrides individual values from
/// flags or `STRATUS_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratusConfig {
    /// Docker CLI binary.
    pub docker_bin: String,
    /// Terraform CLI binary.
    pub terraform_bin: String,
    /// AWS CLI binary.
    pub aws_bin: String,
    /// AWS named profile used for every remote call.
    pub aws_profile: String,
    /// Maximum number of images published concurrently.
    pub push_concurrency: usize,
    /// Directory (relative to the app) for generated compose files.
    pub artifact_dir: String,
    /// Directory (relative to the app) for the infra definition.
    pub infra_dir: String,
}

impl Default for StratusConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".into(),
            terraform_bin: "terraform".into(),
            aws_bin: "aws".into(),
            aws_profile: "default".into(),
            push_concurrency: constants::DEFAULT_PUSH_CONCURRENCY,
            artifact_dir: constants::DEFAULT_ARTIFACT_DIR.into(),
            infra_dir: constants::DEFAULT_INFRA_DIR.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_standard_binaries() {
        let config = StratusConfig::default();
        assert_eq!(config.docker_bin, "docker");
        assert_eq!(config.terraform_bin, "terraform");
        assert_eq!(config.push_concurrency, 4);
    }
}
