//! [`CloudAccount`] backed by the `aws` CLI.

use std::path::PathBuf;
use std::process::Command;

use stratus_common::context::Secrets;
use stratus_common::error::{Result, StratusError};

use super::docker::DockerCli;
use super::process::{locate, run_captured};
use crate::account::CloudAccount;
use crate::context::{LOCK_TABLE, RemoteAccount};

const TOOL: &str = "aws";
const NOT_FOUND_MARKERS: [&str; 4] = ["ResourceNotFoundException", "RepositoryNotFoundException", "Not Found", "404"];

/// Talks to the account through the aws CLI; logs docker in to the registry.
#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: PathBuf,
    docker: DockerCli,
}

impl AwsCli {
    /// Locates the aws binary on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an external-tool error if the binary cannot be found.
    pub fn locate(binary: &str, docker: DockerCli) -> Result<Self> {
        Ok(Self {
            binary: locate(TOOL, binary)?,
            docker,
        })
    }

    fn command(&self, account: &RemoteAccount, args: &[&str]) -> Command {
        let mut command = Command::new(&self.binary);
        let _ = command
            .args(args)
            .args(["--profile", account.profile.as_str(), "--region", account.region.as_str()]);
        command
    }

    /// Runs a lookup, mapping "not found" answers to `false`.
    fn exists(&self, account: &RemoteAccount, args: &[&str]) -> Result<bool> {
        match run_captured(TOOL, self.command(account, args)) {
            Ok(_) => Ok(true),
            Err(StratusError::ExternalTool { message, .. }) if is_not_found(&message) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn ensure_state_bucket(&self, account: &RemoteAccount) -> Result<()> {
        let bucket = account.state_bucket();
        if self.exists(account, &["s3api", "head-bucket", "--bucket", bucket.as_str()])? {
            return Ok(());
        }
        let location = format!("LocationConstraint={}", account.region);
        let mut args = vec!["s3api", "create-bucket", "--bucket", bucket.as_str()];
        if account.region != "us-east-1" {
            args.extend(["--create-bucket-configuration", location.as_str()]);
        }
        let _ = run_captured(TOOL, self.command(account, &args))?;
        tracing::info!(bucket = %bucket, "created state bucket");
        Ok(())
    }

    fn ensure_lock_table(&self, account: &RemoteAccount) -> Result<()> {
        if self.exists(account, &["dynamodb", "describe-table", "--table-name", LOCK_TABLE])? {
            return Ok(());
        }
        let _ = run_captured(
            TOOL,
            self.command(
                account,
                &[
                    "dynamodb",
                    "create-table",
                    "--table-name",
                    LOCK_TABLE,
                    "--attribute-definitions",
                    "AttributeName=LockID,AttributeType=S",
                    "--key-schema",
                    "AttributeName=LockID,KeyType=HASH",
                    "--provisioned-throughput",
                    "ReadCapacityUnits=1,WriteCapacityUnits=1",
                ],
            ),
        )?;
        let _ = run_captured(
            TOOL,
            self.command(account, &["dynamodb", "wait", "table-exists", "--table-name", LOCK_TABLE]),
        )?;
        tracing::info!(table = LOCK_TABLE, "created lock table");
        Ok(())
    }
}

fn is_not_found(message: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Parses the secret string: a flat JSON object of string values.
fn parse_secrets(text: &str) -> Result<Secrets> {
    let text = text.trim();
    if text.is_empty() || text == "None" {
        return Ok(Secrets::new());
    }
    Ok(serde_json::from_str(text)?)
}

impl CloudAccount for AwsCli {
    fn ensure_account(&self, account: &RemoteAccount) -> Result<()> {
        self.ensure_state_bucket(account)?;
        self.ensure_lock_table(account)
    }

    fn ensure_repository(&self, account: &RemoteAccount, name: &str) -> Result<()> {
        if self.exists(account, &["ecr", "describe-repositories", "--repository-names", name])? {
            return Ok(());
        }
        let _ = run_captured(
            TOOL,
            self.command(account, &["ecr", "create-repository", "--repository-name", name]),
        )?;
        tracing::info!(repository = name, "created image repository");
        Ok(())
    }

    fn registry_login(&self, account: &RemoteAccount) -> Result<String> {
        let password = run_captured(TOOL, self.command(account, &["ecr", "get-login-password"]))?;
        let registry = account.registry();
        self.docker.login(&registry, "AWS", password.trim())?;
        Ok(registry)
    }

    fn read_secrets(&self, account: &RemoteAccount) -> Result<Secrets> {
        let secret_id = account.secret_id();
        let args = [
            "secretsmanager",
            "get-secret-value",
            "--secret-id",
            secret_id.as_str(),
            "--query",
            "SecretString",
            "--output",
            "text",
        ];
        match run_captured(TOOL, self.command(account, &args)) {
            Ok(text) => parse_secrets(&text),
            Err(StratusError::ExternalTool { message, .. }) if is_not_found(&message) => {
                tracing::warn!(secret = %secret_id, "no secrets stored for this application");
                Ok(Secrets::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_parse_from_json_object() {
        let secrets = parse_secrets("{\"API_KEY\":\"abc\",\"DB_PASSWORD\":\"pw\"}\n").expect("parse");
        assert_eq!(secrets["API_KEY"], "abc");
        assert_eq!(secrets.len(), 2);
        assert!(parse_secrets("None\n").expect("empty").is_empty());
        assert!(parse_secrets("[1, 2]").is_err());
    }

    #[test]
    fn not_found_detection() {
        assert!(is_not_found(
            "An error occurred (ResourceNotFoundException) when calling the GetSecretValue operation"
        ));
        assert!(!is_not_found("An error occurred (AccessDenied)"));
    }
}
