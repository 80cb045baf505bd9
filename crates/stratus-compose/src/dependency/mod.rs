//! Resolution of declared dependencies into container and deploy configuration.
//!
//! Every dependency name maps to exactly one [`DependencyKind`]. The kind
//! decides how the dependency is containerised, which variables it injects
//! into consuming services, and what the infra tool needs to provision it.
//! Callers only talk to [`Dependency`] and never branch on the kind.

mod generic;
mod managed_db;
mod message_bus;

use std::collections::BTreeMap;

use stratus_common::context::{AppContext, Secrets};
use stratus_common::dependency::{DependencyDescriptor, Lifecycle};
use stratus_common::error::{Result, StratusError};

pub use generic::GenericDependency;
pub use managed_db::ManagedDatabase;
pub use message_bus::{MessageBus, SERVICE_ROUTES_VAR};

use crate::partial::{ConfigurationPartial, ContainerSpec};

/// Behavioral category of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// A message bus; carries the routing table.
    MessageBus {
        /// Image repository, without tag.
        repository: &'static str,
    },
    /// A relational database provisioned by the cloud provider.
    ManagedDatabase,
    /// Any other container built from its descriptor.
    Generic,
}

impl DependencyKind {
    /// Looks up the kind of a dependency name for a lifecycle.
    ///
    /// Managed databases only exist remotely; locally they run as generic
    /// containers.
    pub fn of(name: &str, lifecycle: Lifecycle) -> Self {
        match (name, lifecycle) {
            ("exocom", _) => Self::MessageBus {
                repository: "originate/exocom",
            },
            ("msgbus", _) => Self::MessageBus {
                repository: "msgbus",
            },
            ("postgres" | "mysql", Lifecycle::Remote) => Self::ManagedDatabase,
            _ => Self::Generic,
        }
    }
}

/// Who declared a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyScope<'a> {
    /// Declared in `application.yml`, shared by every service.
    Application,
    /// Declared in a service's `service.yml`.
    Service(&'a str),
}

/// A resolved dependency.
#[derive(Debug, Clone)]
pub enum Dependency<'a> {
    /// Message bus kind.
    MessageBus(MessageBus<'a>),
    /// Managed relational database kind.
    ManagedDatabase(ManagedDatabase<'a>),
    /// Generic container kind.
    Generic(GenericDependency<'a>),
}

/// Resolves a descriptor into its kind-specific behavior.
pub fn resolve<'a>(
    descriptor: &'a DependencyDescriptor,
    scope: DependencyScope<'a>,
    lifecycle: Lifecycle,
    ctx: &'a AppContext,
) -> Dependency<'a> {
    let kind = DependencyKind::of(&descriptor.name, lifecycle);
    tracing::trace!(dependency = %descriptor, ?kind, ?scope, "resolving dependency");
    match kind {
        DependencyKind::MessageBus { repository } => Dependency::MessageBus(MessageBus {
            descriptor,
            repository,
            lifecycle,
            ctx,
        }),
        DependencyKind::ManagedDatabase => Dependency::ManagedDatabase(ManagedDatabase { descriptor }),
        DependencyKind::Generic => Dependency::Generic(GenericDependency {
            descriptor,
            lifecycle,
        }),
    }
}

/// Resolves every application-scope dependency of a lifecycle.
pub fn app_dependencies(ctx: &AppContext, lifecycle: Lifecycle) -> Vec<Dependency<'_>> {
    ctx.app_dependencies(lifecycle)
        .iter()
        .map(|descriptor| resolve(descriptor, DependencyScope::Application, lifecycle, ctx))
        .collect()
}

/// Resolves the private dependencies of a service, minus those shadowed by
/// an application-scope dependency of the same name.
pub fn service_dependencies<'a>(
    ctx: &'a AppContext,
    role: &'a str,
    lifecycle: Lifecycle,
) -> Vec<Dependency<'a>> {
    ctx.service_dependencies(role, lifecycle)
        .into_iter()
        .map(|descriptor| resolve(descriptor, DependencyScope::Service(role), lifecycle, ctx))
        .collect()
}

impl Dependency<'_> {
    /// The descriptor this dependency was resolved from.
    pub const fn descriptor(&self) -> &DependencyDescriptor {
        match self {
            Self::MessageBus(d) => d.descriptor,
            Self::ManagedDatabase(d) => d.descriptor,
            Self::Generic(d) => d.descriptor,
        }
    }

    /// Dependency name.
    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Whether the dependency runs as a container.
    pub const fn has_container_config(&self) -> bool {
        !matches!(self, Self::ManagedDatabase(_))
    }

    /// Container and compose-entry name.
    pub fn container_name(&self) -> String {
        self.descriptor().container_name()
    }

    /// Container spec, or `None` for dependencies provisioned out-of-band.
    ///
    /// # Errors
    ///
    /// Returns an error if the routing table cannot be serialised.
    pub fn container_spec(&self) -> Result<Option<ContainerSpec>> {
        match self {
            Self::MessageBus(d) => d.container_spec().map(Some),
            Self::ManagedDatabase(_) => Ok(None),
            Self::Generic(d) => Ok(Some(d.container_spec())),
        }
    }

    /// Partial holding the dependency's container and volumes.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`container_spec`](Self::container_spec).
    pub fn partial(&self) -> Result<ConfigurationPartial> {
        let Some(spec) = self.container_spec()? else {
            return Ok(ConfigurationPartial::empty());
        };
        let mut partial = ConfigurationPartial::single(self.container_name(), spec);
        if let Self::Generic(d) = self {
            partial.volume_names = d.volume_names();
        }
        Ok(partial)
    }

    /// Variables injected into consuming services during local runs.
    pub fn service_env_variables(&self) -> BTreeMap<String, String> {
        match self {
            Self::MessageBus(d) => d.service_env_variables(),
            Self::ManagedDatabase(d) => d.service_env_variables(),
            Self::Generic(d) => d.service_env_variables(),
        }
    }

    /// Variables injected into consuming services once deployed.
    ///
    /// # Errors
    ///
    /// Returns [`StratusError::SecretMissing`] if a required secret is absent.
    pub fn deployment_service_env_variables(&self, secrets: &Secrets) -> Result<BTreeMap<String, String>> {
        match self {
            Self::MessageBus(d) => Ok(d.service_env_variables()),
            Self::ManagedDatabase(d) => d.deployment_service_env_variables(secrets),
            Self::Generic(d) => Ok(d.service_env_variables()),
        }
    }

    /// Module configuration for the infra definition.
    pub fn deployment_config(&self) -> BTreeMap<String, String> {
        match self {
            Self::MessageBus(d) => d.deployment_config(),
            Self::ManagedDatabase(d) => d.deployment_config(),
            Self::Generic(_) => BTreeMap::new(),
        }
    }

    /// Variables the infra tool needs to provision the dependency.
    ///
    /// # Errors
    ///
    /// Returns an error if the routing table cannot be serialised.
    pub fn deployment_variables(&self) -> Result<BTreeMap<String, String>> {
        match self {
            Self::MessageBus(d) => d.deployment_variables(),
            Self::ManagedDatabase(d) => Ok(d.deployment_variables()),
            Self::Generic(_) => Ok(BTreeMap::new()),
        }
    }

    /// Checks that every field the kind requires is present.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the dependency and the field path.
    pub fn validate(&self) -> Result<()> {
        let descriptor = self.descriptor();
        let subject = production_subject(descriptor);
        if descriptor.name.trim().is_empty() {
            return Err(StratusError::missing_field(subject, "name"));
        }
        if descriptor.version.trim().is_empty() {
            return Err(StratusError::missing_field(subject, "version"));
        }
        match self {
            Self::ManagedDatabase(d) => d.validate(),
            Self::MessageBus(_) | Self::Generic(_) => Ok(()),
        }
    }
}

fn production_subject(descriptor: &DependencyDescriptor) -> String {
    format!("production dependency {descriptor}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_maps_names_to_kinds() {
        assert!(matches!(
            DependencyKind::of("exocom", Lifecycle::Local),
            DependencyKind::MessageBus { repository: "originate/exocom" }
        ));
        assert!(matches!(
            DependencyKind::of("msgbus", Lifecycle::Remote),
            DependencyKind::MessageBus { repository: "msgbus" }
        ));
        assert_eq!(DependencyKind::of("postgres", Lifecycle::Remote), DependencyKind::ManagedDatabase);
        assert_eq!(DependencyKind::of("mysql", Lifecycle::Remote), DependencyKind::ManagedDatabase);
        assert_eq!(DependencyKind::of("postgres", Lifecycle::Local), DependencyKind::Generic);
        assert_eq!(DependencyKind::of("mongo", Lifecycle::Remote), DependencyKind::Generic);
    }

    #[test]
    fn empty_version_fails_validation() {
        let ctx = AppContext::from_parts("/x", Default::default(), BTreeMap::new());
        let descriptor = DependencyDescriptor::new("mongo", "");
        let dep = resolve(&descriptor, DependencyScope::Application, Lifecycle::Remote, &ctx);
        let msg = dep.validate().unwrap_err().to_string();
        assert!(msg.contains("mongo:"), "got: {msg}");
        assert!(msg.contains("'version'"), "got: {msg}");
    }
}
