use std::collections::BTreeMap;

use stratus_common::app::is_hyphenated_alphanumeric;
use stratus_common::constants::env_prefix;
use stratus_common::context::Secrets;
use stratus_common::dependency::{DependencyDescriptor, RdsConfig};
use stratus_common::error::{Result, StratusError};

use super::production_subject;

/// A relational database provisioned by the cloud provider.
#[derive(Debug, Clone)]
pub struct ManagedDatabase<'a> {
    pub(super) descriptor: &'a DependencyDescriptor,
}

impl ManagedDatabase<'_> {
    fn rds(&self) -> Option<&RdsConfig> {
        self.descriptor.config.rds.as_ref()
    }

    fn field(&self, pick: impl Fn(&RdsConfig) -> Option<&String>) -> String {
        self.rds().and_then(pick).cloned().unwrap_or_default()
    }

    fn host(&self) -> String {
        format!("{}.rds.local", self.field(|r| r.db_name.as_ref()))
    }

    /// Host, database name and user name. The password is only known remotely.
    pub(super) fn service_env_variables(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        let _ = vars.insert(env_prefix(&self.descriptor.name), self.host());
        if let Some(rds) = self.rds() {
            let names = &rds.service_env_var_names;
            if let (Some(key), Some(value)) = (&names.db_name, &rds.db_name) {
                let _ = vars.insert(key.clone(), value.clone());
            }
            if let (Some(key), Some(value)) = (&names.username, &rds.username) {
                let _ = vars.insert(key.clone(), value.clone());
            }
        }
        vars
    }

    pub(super) fn deployment_service_env_variables(&self, secrets: &Secrets) -> Result<BTreeMap<String, String>> {
        let mut vars = self.service_env_variables();
        let Some(rds) = self.rds() else {
            return Ok(vars);
        };
        if let (Some(key), Some(secret_name)) = (&rds.service_env_var_names.password, &rds.password_secret_name) {
            let password = secrets
                .get(secret_name)
                .ok_or_else(|| StratusError::SecretMissing {
                    key: secret_name.clone(),
                })?;
            let _ = vars.insert(key.clone(), password.clone());
        }
        Ok(vars)
    }

    pub(super) fn deployment_config(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("engine".to_string(), self.descriptor.name.clone()),
            ("version".to_string(), self.descriptor.version.clone()),
        ])
    }

    pub(super) fn deployment_variables(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("allocated_storage".to_string(), self.field(|r| r.allocated_storage.as_ref())),
            ("instance_class".to_string(), self.field(|r| r.instance_class.as_ref())),
            ("storage_type".to_string(), self.field(|r| r.storage_type.as_ref())),
            ("db_name".to_string(), self.field(|r| r.db_name.as_ref())),
            ("username".to_string(), self.field(|r| r.username.as_ref())),
            (
                "password_secret_name".to_string(),
                self.field(|r| r.password_secret_name.as_ref()),
            ),
            ("engine".to_string(), self.descriptor.name.clone()),
            ("engine_version".to_string(), self.descriptor.version.clone()),
        ])
    }

    pub(super) fn validate(&self) -> Result<()> {
        let subject = production_subject(self.descriptor);
        let Some(rds) = self.rds() else {
            return Err(StratusError::missing_field(subject, "rds"));
        };
        let names = &rds.service_env_var_names;
        let required: [(&str, &Option<String>); 9] = [
            ("rds.allocated-storage", &rds.allocated_storage),
            ("rds.instance-class", &rds.instance_class),
            ("rds.storage-type", &rds.storage_type),
            ("rds.db-name", &rds.db_name),
            ("rds.username", &rds.username),
            ("rds.password-secret-name", &rds.password_secret_name),
            ("rds.service-env-var-names.db-name", &names.db_name),
            ("rds.service-env-var-names.username", &names.username),
            ("rds.service-env-var-names.password", &names.password),
        ];
        for (path, value) in required {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(StratusError::missing_field(subject, path));
            }
        }
        if rds
            .db_name
            .as_deref()
            .is_some_and(|db_name| !is_hyphenated_alphanumeric(db_name, false))
        {
            return Err(StratusError::invalid_field(
                subject,
                "rds.db-name",
                "only alphanumeric characters and hyphens allowed in",
            ));
        }
        Ok(())
    }
}
