//! Cloud account and secret store abstraction.

use stratus_common::context::Secrets;
use stratus_common::error::Result;

use crate::context::RemoteAccount;

/// Operations the deploy needs from the cloud account.
pub trait CloudAccount: Send + Sync {
    /// Creates the state bucket and lock table if they are missing.
    /// Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if a prerequisite cannot be inspected or created.
    fn ensure_account(&self, account: &RemoteAccount) -> Result<()>;

    /// Creates the image repository `name` if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be inspected or created.
    fn ensure_repository(&self, account: &RemoteAccount, name: &str) -> Result<()>;

    /// Authenticates the container runtime against the account's registry
    /// and returns the registry host.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials cannot be obtained or are rejected.
    fn registry_login(&self, account: &RemoteAccount) -> Result<String>;

    /// Reads the application's secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret store cannot be read.
    fn read_secrets(&self, account: &RemoteAccount) -> Result<Secrets>;
}

/// Interactive confirmation by whoever runs the deploy.
pub trait Operator: Send + Sync {
    /// Asks a yes/no question; `false` when declined.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}
