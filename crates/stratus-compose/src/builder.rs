//! Producers of configuration partials for a build mode.

use std::collections::BTreeMap;

use stratus_common::app::{ServiceOrigin, ServiceSource};
use stratus_common::constants::{PROD_DOCKERFILE, SOURCE_MOUNT_POINT};
use stratus_common::context::AppContext;
use stratus_common::error::{Result, StratusError};
use stratus_common::mode::{BuildMode, BuildTarget, EnvironmentTier};

use crate::dependency::{self, Dependency};
use crate::endpoints::ServiceEndpoints;
use crate::env::compile_local_env;
use crate::partial::{BuildSpec, ConfigurationPartial, ContainerSpec};

/// Looks up a secret by key in the operator's environment.
pub type SecretLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Compiles an application into configuration partials.
pub struct ComposeBuilder<'a> {
    ctx: &'a AppContext,
    mode: BuildMode,
    endpoints: ServiceEndpoints,
    lookup: Box<SecretLookup<'a>>,
}

impl std::fmt::Debug for ComposeBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposeBuilder")
            .field("app", &self.ctx.name())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> ComposeBuilder<'a> {
    /// Creates a builder that resolves local secrets from the process environment.
    pub fn new(ctx: &'a AppContext, mode: BuildMode) -> Self {
        Self::with_secret_lookup(ctx, mode, |key| std::env::var(key).ok())
    }

    /// Creates a builder with a custom local secret lookup.
    pub fn with_secret_lookup(
        ctx: &'a AppContext,
        mode: BuildMode,
        lookup: impl Fn(&str) -> Option<String> + 'a,
    ) -> Self {
        Self {
            ctx,
            mode,
            endpoints: ServiceEndpoints::new(ctx, mode),
            lookup: Box::new(lookup),
        }
    }

    /// The whole container graph: dependencies first, then services.
    ///
    /// # Errors
    ///
    /// Propagates dependency and environment resolution errors.
    pub fn application_partial(&self) -> Result<ConfigurationPartial> {
        let partial = self.dependencies_partial()?.merge(self.services_partial()?);
        tracing::debug!(
            app = %self.ctx.name(),
            mode = %self.mode,
            components = partial.services.len(),
            "application partial compiled"
        );
        Ok(partial)
    }

    /// Containers of every application-scope dependency for the mode's lifecycle.
    ///
    /// # Errors
    ///
    /// Propagates dependency resolution errors.
    pub fn dependencies_partial(&self) -> Result<ConfigurationPartial> {
        let partials = dependency::app_dependencies(self.ctx, self.mode.lifecycle())
            .iter()
            .map(Dependency::partial)
            .collect::<Result<Vec<_>>>()?;
        Ok(ConfigurationPartial::merge_all(partials))
    }

    /// Every service, each merged with its private dependencies.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`service_partial`](Self::service_partial).
    pub fn services_partial(&self) -> Result<ConfigurationPartial> {
        let partials = self
            .ctx
            .definition
            .services
            .keys()
            .map(|role| self.service_partial(role))
            .collect::<Result<Vec<_>>>()?;
        Ok(ConfigurationPartial::merge_all(partials))
    }

    /// A single service and its private dependencies.
    ///
    /// The service entry is merged last so no dependency can replace it.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown role, an invalid source, or a
    /// failing dependency resolution.
    pub fn service_partial(&self, role: &str) -> Result<ConfigurationPartial> {
        let private = dependency::service_dependencies(self.ctx, role, self.mode.lifecycle());
        let mut partials = Vec::with_capacity(private.len() + 1);
        for dep in &private {
            partials.push(dep.partial()?);
        }
        let spec = match self.mode.target {
            BuildTarget::Local => self.local_service_spec(role, &private)?,
            BuildTarget::Deploy => self.deploy_service_spec(role)?,
        };
        partials.push(ConfigurationPartial::single(role, spec));
        Ok(ConfigurationPartial::merge_all(partials))
    }

    fn local_service_spec(&self, role: &str, private: &[Dependency<'_>]) -> Result<ContainerSpec> {
        let source = self.source(role)?;
        let config = self.ctx.service(role)?;
        let mut spec = match source.origin(role)? {
            ServiceOrigin::Location(_) => {
                let context = source
                    .build_context(&self.ctx.dir)
                    .unwrap_or_else(|| self.ctx.dir.clone());
                let command = match self.mode.environment {
                    EnvironmentTier::Development => config.startup.command.clone(),
                    EnvironmentTier::Test => config.development.scripts.test.clone(),
                    EnvironmentTier::Production => None,
                };
                let volumes = if self.mode.mount {
                    vec![format!("{}:{SOURCE_MOUNT_POINT}", context.display())]
                } else {
                    Vec::new()
                };
                ContainerSpec {
                    build: Some(BuildSpec {
                        context: context.display().to_string(),
                        dockerfile: self.mode.dockerfile().to_string(),
                    }),
                    command,
                    volumes,
                    links: private
                        .iter()
                        .filter(|dep| dep.has_container_config())
                        .map(|dep| format!("{}:{}", dep.container_name(), dep.name()))
                        .collect(),
                    ..ContainerSpec::default()
                }
            }
            ServiceOrigin::DockerImage(image) => ContainerSpec {
                image: Some(image.to_string()),
                ..ContainerSpec::default()
            },
        };
        spec.container_name = Some(role.to_string());
        spec.ports = config.local.ports.clone();
        if let Some(mapping) = self.endpoints.port_mapping(role) {
            spec.ports.push(mapping);
        }
        spec.environment = compile_local_env(self.ctx, role, self.mode, &self.endpoints, &*self.lookup)?;
        spec.depends_on = self.depends_on(role);
        Ok(spec)
    }

    fn deploy_service_spec(&self, role: &str) -> Result<ContainerSpec> {
        let source = self.source(role)?;
        Ok(match source.origin(role)? {
            ServiceOrigin::Location(_) => ContainerSpec {
                build: Some(BuildSpec {
                    context: source
                        .build_context(&self.ctx.dir)
                        .unwrap_or_else(|| self.ctx.dir.clone())
                        .display()
                        .to_string(),
                    dockerfile: PROD_DOCKERFILE.to_string(),
                }),
                ..ContainerSpec::default()
            },
            ServiceOrigin::DockerImage(image) => ContainerSpec {
                image: Some(image.to_string()),
                ..ContainerSpec::default()
            },
        })
    }

    /// Every application-scope dependency plus the service's own, in
    /// declaration order without duplicates.
    fn depends_on(&self, role: &str) -> Vec<String> {
        let lifecycle = self.mode.lifecycle();
        let mut names: Vec<String> = Vec::new();
        for dep in dependency::app_dependencies(self.ctx, lifecycle)
            .iter()
            .chain(&dependency::service_dependencies(self.ctx, role, lifecycle))
            .filter(|dep| dep.has_container_config())
        {
            let name = dep.container_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn source(&self, role: &str) -> Result<&'a ServiceSource> {
        self.ctx.source(role).ok_or_else(|| StratusError::Resolution {
            dependency: role.to_string(),
            message: "no such service".into(),
        })
    }
}

/// Image or build source of every component, keyed by component name.
pub fn component_sources(partial: &ConfigurationPartial) -> BTreeMap<&str, String> {
    partial
        .services
        .iter()
        .map(|(name, spec)| (name.as_str(), spec.source_label()))
        .collect()
}
