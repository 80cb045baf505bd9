use std::collections::BTreeMap;

use stratus_common::constants::{DEPENDENCY_RESTART_POLICY, env_prefix};
use stratus_common::context::AppContext;
use stratus_common::dependency::{DependencyDescriptor, Lifecycle};
use stratus_common::error::Result;

use crate::partial::ContainerSpec;
use crate::routing::compile_routing_table;

/// Variable carrying the routing table.
pub const SERVICE_ROUTES_VAR: &str = "SERVICE_ROUTES";

/// A message bus dependency.
#[derive(Debug, Clone)]
pub struct MessageBus<'a> {
    pub(super) descriptor: &'a DependencyDescriptor,
    pub(super) repository: &'static str,
    pub(super) lifecycle: Lifecycle,
    pub(super) ctx: &'a AppContext,
}

impl MessageBus<'_> {
    fn image(&self) -> String {
        format!("{}:{}", self.repository, self.descriptor.version)
    }

    pub(super) fn container_spec(&self) -> Result<ContainerSpec> {
        if self.lifecycle == Lifecycle::Remote {
            return Ok(ContainerSpec {
                image: Some(self.image()),
                ..ContainerSpec::default()
            });
        }
        let mut environment = BTreeMap::new();
        let _ = environment.insert("ROLE".to_string(), self.descriptor.name.clone());
        let _ = environment.insert(SERVICE_ROUTES_VAR.to_string(), compile_routing_table(self.ctx)?);
        Ok(ContainerSpec {
            image: Some(self.image()),
            container_name: Some(self.descriptor.container_name()),
            environment,
            restart: Some(DEPENDENCY_RESTART_POLICY.to_string()),
            ..ContainerSpec::default()
        })
    }

    /// `<NAME>_HOST`: the container name locally, the private DNS name remotely.
    pub(super) fn service_env_variables(&self) -> BTreeMap<String, String> {
        let host = match self.lifecycle {
            Lifecycle::Local => self.descriptor.container_name(),
            Lifecycle::Remote => format!("{}.{}.local", self.descriptor.name, self.ctx.name()),
        };
        BTreeMap::from([(format!("{}_HOST", env_prefix(&self.descriptor.name)), host)])
    }

    pub(super) fn deployment_config(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("version".to_string(), self.descriptor.version.clone()),
            ("dnsName".to_string(), self.ctx.definition.remote.url.clone()),
        ])
    }

    pub(super) fn deployment_variables(&self) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::from([(
            SERVICE_ROUTES_VAR.to_string(),
            compile_routing_table(self.ctx)?,
        )]))
    }
}
