//! Dependency descriptors shared by `application.yml` and `service.yml`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A declared dependency: name, version, and kind-specific configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependencyDescriptor {
    /// Registry name; determines the dependency kind.
    pub name: String,
    /// Version, used as the image tag.
    pub version: String,
    /// Kind-specific configuration.
    pub config: DependencyConfig,
}

impl DependencyDescriptor {
    /// Creates a descriptor with an empty configuration.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            config: DependencyConfig::default(),
        }
    }

    /// Container and compose-entry name: `name` immediately followed by `version`.
    pub fn container_name(&self) -> String {
        format!("{}{}", self.name, self.version)
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Configuration block of a dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependencyConfig {
    /// Port mappings (`host:container`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Container paths whose data must survive restarts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub persist: Vec<String>,
    /// Environment passed to the dependency container itself.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependency_environment: BTreeMap<String, String>,
    /// Environment passed to every service that uses the dependency.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub service_environment: BTreeMap<String, String>,
    /// Managed relational database settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rds: Option<RdsConfig>,
}

/// Provisioning parameters of a managed relational database.
///
/// Every field is optional so that missing values can be reported by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RdsConfig {
    /// Storage size in gigabytes.
    pub allocated_storage: Option<String>,
    /// Instance class, e.g. `db.t2.micro`.
    pub instance_class: Option<String>,
    /// Storage type, e.g. `gp2`.
    pub storage_type: Option<String>,
    /// Database name; alphanumerics and hyphens only.
    pub db_name: Option<String>,
    /// Master user name.
    pub username: Option<String>,
    /// Secret-store key holding the master password.
    pub password_secret_name: Option<String>,
    /// Names of the variables injected into consuming services.
    pub service_env_var_names: ServiceEnvVarNames,
}

/// Variable names under which database coordinates reach a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceEnvVarNames {
    /// Variable carrying the database name.
    pub db_name: Option<String>,
    /// Variable carrying the user name.
    pub username: Option<String>,
    /// Variable carrying the password.
    pub password: Option<String>,
}

/// Which of the two dependency lifecycles is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Built per local run (development, test, local production).
    Local,
    /// Built once per deploy.
    Remote,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_name_concatenates_name_and_version() {
        let dep = DependencyDescriptor::new("exocom", "0.26.1");
        assert_eq!(dep.container_name(), "exocom0.26.1");
        assert_eq!(dep.to_string(), "exocom:0.26.1");
    }

    #[test]
    fn descriptor_parses_from_kebab_case_yaml() {
        let yaml = r"
name: mongo
version: 3.4.0
config:
  ports: ['4000:4000']
  persist: ['/data/db']
  dependency-environment:
    DB_NAME: test-db
  service-environment:
    COLLECTION_NAME: test-collection
";
        let dep: DependencyDescriptor = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(dep.name, "mongo");
        assert_eq!(dep.version, "3.4.0");
        assert_eq!(dep.config.ports, vec!["4000:4000"]);
        assert_eq!(dep.config.persist, vec!["/data/db"]);
        assert_eq!(
            dep.config.dependency_environment.get("DB_NAME").map(String::as_str),
            Some("test-db")
        );
        assert!(dep.config.rds.is_none());
    }

    #[test]
    fn rds_block_parses_nested_names() {
        let yaml = r"
name: postgres
version: 0.0.1
config:
  rds:
    allocated-storage: '10'
    db-name: my-db
    service-env-var-names:
      db-name: DATABASE_NAME
";
        let dep: DependencyDescriptor = serde_yaml::from_str(yaml).expect("parse");
        let rds = dep.config.rds.expect("rds");
        assert_eq!(rds.db_name.as_deref(), Some("my-db"));
        assert_eq!(rds.service_env_var_names.db_name.as_deref(), Some("DATABASE_NAME"));
        assert!(rds.username.is_none());
    }
}
