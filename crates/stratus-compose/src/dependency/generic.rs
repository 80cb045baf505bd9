use std::collections::BTreeMap;

use stratus_common::constants::{DEPENDENCY_RESTART_POLICY, env_prefix};
use stratus_common::dependency::{DependencyDescriptor, Lifecycle};

use crate::partial::ContainerSpec;

/// A dependency run straight from its descriptor.
#[derive(Debug, Clone)]
pub struct GenericDependency<'a> {
    pub(super) descriptor: &'a DependencyDescriptor,
    pub(super) lifecycle: Lifecycle,
}

impl GenericDependency<'_> {
    pub(super) fn container_spec(&self) -> ContainerSpec {
        let config = &self.descriptor.config;
        ContainerSpec {
            image: Some(format!("{}:{}", self.descriptor.name, self.descriptor.version)),
            container_name: Some(self.descriptor.container_name()),
            ports: config.ports.clone(),
            volumes: config
                .persist
                .iter()
                .map(|path| format!("{}:{path}", self.volume_name(path)))
                .collect(),
            environment: config.dependency_environment.clone(),
            restart: Some(DEPENDENCY_RESTART_POLICY.to_string()),
            ..ContainerSpec::default()
        }
    }

    /// Named volumes backing the persisted paths.
    pub(super) fn volume_names(&self) -> Vec<String> {
        self.descriptor
            .config
            .persist
            .iter()
            .map(|path| self.volume_name(path))
            .collect()
    }

    /// `mongo` persisting `/data/db` gets the volume `mongo__data_db`.
    fn volume_name(&self, path: &str) -> String {
        let sanitised: String = path
            .trim_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}__{sanitised}", self.descriptor.name)
    }

    pub(super) fn service_env_variables(&self) -> BTreeMap<String, String> {
        let mut vars = self.descriptor.config.service_environment.clone();
        if self.lifecycle == Lifecycle::Local {
            let _ = vars.insert(env_prefix(&self.descriptor.name), self.descriptor.container_name());
        }
        vars
    }
}
