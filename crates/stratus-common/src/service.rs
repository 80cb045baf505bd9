//! Per-service configuration (`service.yml`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dependency::DependencyDescriptor;
use crate::error::{Result, StratusError};
use crate::mode::EnvironmentTier;

/// Root of `service.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Whether the service is reachable from outside the application.
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    /// Free-form description.
    pub description: String,
    /// How the service starts in development.
    pub startup: StartupConfig,
    /// Messages the service exchanges over the bus.
    pub messages: ServiceMessages,
    /// Development settings.
    pub development: DevelopmentConfig,
    /// Production settings shared by local-production and deploy builds.
    pub production: ProductionConfig,
    /// Local run settings.
    pub local: LocalServiceConfig,
    /// Deploy settings.
    pub remote: RemoteServiceConfig,
}

/// Visibility of a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Exposed through a public endpoint.
    Public,
    /// Only reachable from other services.
    #[default]
    Worker,
}

/// `startup` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StartupConfig {
    /// Command run by development containers.
    pub command: Option<String>,
    /// Log line printed once the service is ready.
    pub online_text: Option<String>,
}

/// `messages` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceMessages {
    /// Messages the service publishes.
    pub sends: Vec<String>,
    /// Messages the service consumes.
    pub receives: Vec<String>,
}

/// `development` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DevelopmentConfig {
    /// Port the service listens on in development and test.
    pub port: Option<u16>,
    /// Named scripts.
    pub scripts: DevelopmentScripts,
}

/// `development.scripts` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DevelopmentScripts {
    /// Script that runs the service.
    pub run: Option<String>,
    /// Script that runs the service's tests.
    pub test: Option<String>,
}

/// `production` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProductionConfig {
    /// Port the service listens on in production builds.
    pub port: Option<u16>,
}

/// `local` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LocalServiceConfig {
    /// Dependencies private to this service.
    pub dependencies: Vec<DependencyDescriptor>,
    /// Static variables per environment tier.
    pub environment: EnvironmentTiers,
    /// Keys read from the operator's environment.
    pub secrets: Vec<String>,
    /// Extra port mappings.
    pub ports: Vec<String>,
}

/// Static variables grouped by tier; `default` applies to every tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnvironmentTiers {
    /// Variables for every tier.
    pub default: BTreeMap<String, String>,
    /// Development-only variables.
    pub development: BTreeMap<String, String>,
    /// Test-only variables.
    pub test: BTreeMap<String, String>,
    /// Production-only variables.
    pub production: BTreeMap<String, String>,
}

impl EnvironmentTiers {
    /// Returns `default` overlaid with the given tier.
    pub fn for_tier(&self, tier: EnvironmentTier) -> BTreeMap<String, String> {
        let overlay = match tier {
            EnvironmentTier::Development => &self.development,
            EnvironmentTier::Test => &self.test,
            EnvironmentTier::Production => &self.production,
        };
        let mut vars = self.default.clone();
        vars.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}

/// `remote` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RemoteServiceConfig {
    /// Dependencies private to this service.
    pub dependencies: Vec<DependencyDescriptor>,
    /// Static variables.
    pub environment: BTreeMap<String, String>,
    /// Keys resolved from the secret store.
    pub secrets: Vec<String>,
    /// Public DNS name (public services).
    pub url: Option<String>,
    /// CPU units reserved per task.
    pub cpu: Option<String>,
    /// Memory reserved per task, in MiB.
    pub memory: Option<String>,
    /// Health-check path.
    pub health_check: Option<String>,
}

impl ServiceConfig {
    /// Listening port for the given tier.
    pub const fn port_for(&self, tier: EnvironmentTier) -> Option<u16> {
        match tier {
            EnvironmentTier::Development | EnvironmentTier::Test => self.development.port,
            EnvironmentTier::Production => self.production.port,
        }
    }

    /// Checks the fields a deploy needs.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing field.
    pub fn validate_deploy_fields(&self, role: &str) -> Result<()> {
        let subject = format!("service {role}");
        if self.remote.cpu.as_deref().is_none_or(str::is_empty) {
            return Err(StratusError::missing_field(subject, "remote.cpu"));
        }
        if self.remote.memory.as_deref().is_none_or(str::is_empty) {
            return Err(StratusError::missing_field(subject, "remote.memory"));
        }
        if self.service_type == ServiceType::Public {
            if self.production.port.is_none() {
                return Err(StratusError::missing_field(subject, "production.port"));
            }
            if self.remote.url.as_deref().is_none_or(str::is_empty) {
                return Err(StratusError::missing_field(subject, "remote.url"));
            }
        }
        Ok(())
    }
}
