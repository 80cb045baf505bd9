//! Unified error types for the Stratus workspace.
//!
//! Every fallible operation in the library crates returns [`StratusError`].
//! The deployment pipeline wraps it with the stage that produced it.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StratusError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A YAML document could not be parsed or produced.
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        /// File the document belongs to.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A declared field is missing or malformed.
    #[error("{subject} has issues: {problem} '{field}'")]
    Validation {
        /// What was being validated (e.g. `production dependency postgres:0.0.1`).
        subject: String,
        /// Dotted path of the offending field.
        field: String,
        /// Description of the problem.
        problem: String,
    },

    /// A dependency could not be resolved into a container or deploy config.
    #[error("cannot resolve dependency {dependency}: {message}")]
    Resolution {
        /// `name:version` of the dependency.
        dependency: String,
        /// Description of the failure.
        message: String,
    },

    /// An external tool exited unsuccessfully or its output could not be read.
    #[error("{tool} failed: {message}")]
    ExternalTool {
        /// Tool name (`docker`, `terraform`, `aws`).
        tool: String,
        /// Description of the failure, usually including stderr.
        message: String,
    },

    /// A declared secret has no value in the secret store.
    #[error("secret '{key}' is declared but missing from the secret store")]
    SecretMissing {
        /// Secret key that was looked up.
        key: String,
    },

    /// The regenerated infrastructure definition differs from the applied one
    /// and the operator did not accept the change.
    #[error("infrastructure drift not accepted: {summary}")]
    DriftDetected {
        /// Short description of the change set.
        summary: String,
    },

    /// The operation was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl StratusError {
    /// Builds a validation error for a field that must be present.
    pub fn missing_field(subject: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            subject: subject.into(),
            field: field.into(),
            problem: "missing required field".into(),
        }
    }

    /// Builds a validation error for a field whose value is not accepted.
    pub fn invalid_field(
        subject: impl Into<String>,
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::Validation {
            subject: subject.into(),
            field: field.into(),
            problem: problem.into(),
        }
    }

    /// Builds an external-tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Builds an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StratusError>;
