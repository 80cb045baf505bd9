//! [`InfraTool`] backed by the `terraform` CLI.

use std::path::{Path, PathBuf};

use stratus_common::constants::INFRA_FILE;
use stratus_common::error::{Result, StratusError};

use super::process::{command_in, locate, run_streaming};
use crate::cancel::CancelToken;
use crate::context::RemoteAccount;
use crate::infra::{InfraDefinition, InfraTool};

const TOOL: &str = "terraform";

/// Writes `main.tf` and drives `terraform init` / `terraform apply`.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
}

impl TerraformCli {
    /// Locates the terraform binary on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an external-tool error if the binary cannot be found.
    pub fn locate(binary: &str) -> Result<Self> {
        Ok(Self {
            binary: locate(TOOL, binary)?,
        })
    }
}

fn init_args(account: &RemoteAccount) -> Vec<String> {
    vec![
        "init".into(),
        "-input=false".into(),
        "-force-copy".into(),
        format!("-backend-config=profile={}", account.profile),
    ]
}

fn apply_args(var_flags: &[String], auto_approve: bool) -> Vec<String> {
    let mut args = vec!["apply".to_string()];
    if auto_approve {
        args.push("-auto-approve".into());
    }
    args.extend(var_flags.iter().cloned());
    args
}

impl InfraTool for TerraformCli {
    fn read_existing_definition(&self, dir: &Path) -> Result<Option<String>> {
        let path = dir.join(INFRA_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StratusError::io(path, e)),
        }
    }

    fn write_definition(&self, dir: &Path, definition: &InfraDefinition) -> Result<String> {
        std::fs::create_dir_all(dir).map_err(|e| StratusError::io(dir, e))?;
        let path = dir.join(INFRA_FILE);
        let text = definition.render();
        std::fs::write(&path, &text).map_err(|e| StratusError::io(&path, e))?;
        tracing::info!(path = %path.display(), "infrastructure definition written");
        Ok(text)
    }

    fn init(&self, dir: &Path, account: &RemoteAccount) -> Result<()> {
        let mut command = command_in(&self.binary, dir);
        let _ = command.args(init_args(account));
        run_streaming(TOOL, command, &CancelToken::new())
    }

    fn apply(&self, dir: &Path, var_flags: &[String], auto_approve: bool, cancel: &CancelToken) -> Result<()> {
        let mut command = command_in(&self.binary, dir);
        let _ = command.args(apply_args(var_flags, auto_approve));
        run_streaming(TOOL, command, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> TerraformCli {
        TerraformCli {
            binary: PathBuf::from("terraform"),
        }
    }

    #[test]
    fn missing_definition_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(cli().read_existing_definition(dir.path()).expect("read"), None);
    }

    #[test]
    fn written_definition_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let infra_dir = dir.path().join("terraform");
        let definition = InfraDefinition {
            app_name: "todo".into(),
            account: RemoteAccount {
                profile: "ops".into(),
                region: "us-west-2".into(),
                account_id: "1".into(),
                app_name: "todo".into(),
            },
            url: "todo.example.com".into(),
            ssl_certificate_arn: "arn:cert".into(),
            services: Vec::new(),
            dependencies: Vec::new(),
            variables: std::collections::BTreeSet::new(),
        };
        let written = cli().write_definition(&infra_dir, &definition).expect("write");
        assert_eq!(
            cli().read_existing_definition(&infra_dir).expect("read"),
            Some(written)
        );
    }

    #[test]
    fn apply_flags_after_approval() {
        let flags = vec!["-var".to_string(), "aws_profile=ops".to_string()];
        assert_eq!(apply_args(&flags, true), vec!["apply", "-auto-approve", "-var", "aws_profile=ops"]);
        assert_eq!(apply_args(&flags, false), vec!["apply", "-var", "aws_profile=ops"]);
    }

    #[test]
    fn init_uses_account_profile() {
        let account = RemoteAccount {
            profile: "ops".into(),
            region: "us-west-2".into(),
            account_id: "1".into(),
            app_name: "todo".into(),
        };
        assert!(init_args(&account).contains(&"-backend-config=profile=ops".to_string()));
    }
}
