//! Loading an application directory into memory.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::app::{ApplicationDefinition, ServiceOrigin, ServiceSource};
use crate::constants::{APPLICATION_FILE, SERVICE_FILE};
use crate::dependency::{DependencyDescriptor, Lifecycle};
use crate::error::{Result, StratusError};
use crate::service::ServiceConfig;

/// Secret key to value mapping.
pub type Secrets = BTreeMap<String, String>;

/// An application definition plus the configuration of each of its services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    /// Absolute directory containing `application.yml`.
    pub dir: PathBuf,
    /// Parsed `application.yml`.
    pub definition: ApplicationDefinition,
    /// Service role to parsed `service.yml`.
    pub services: BTreeMap<String, ServiceConfig>,
}

impl AppContext {
    /// Reads `application.yml` and every internal service's `service.yml`.
    ///
    /// Services sourced from an external image get an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is missing or malformed, or if the
    /// definition violates its naming invariants.
    pub fn load(dir: &Path) -> Result<Self> {
        let definition: ApplicationDefinition = read_yaml(&dir.join(APPLICATION_FILE))?;
        definition.validate_names()?;

        let mut services = BTreeMap::new();
        for (role, source) in &definition.services {
            let config = match source.origin(role)? {
                ServiceOrigin::Location(_) => {
                    let context = source
                        .build_context(dir)
                        .unwrap_or_else(|| dir.to_path_buf());
                    read_yaml(&context.join(SERVICE_FILE))?
                }
                ServiceOrigin::DockerImage(_) => ServiceConfig::default(),
            };
            let _ = services.insert(role.clone(), config);
        }

        tracing::debug!(
            app = %definition.name,
            services = services.len(),
            "application loaded"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            definition,
            services,
        })
    }

    /// Builds a context from already-parsed parts.
    pub fn from_parts(
        dir: impl Into<PathBuf>,
        definition: ApplicationDefinition,
        services: BTreeMap<String, ServiceConfig>,
    ) -> Self {
        Self {
            dir: dir.into(),
            definition,
            services,
        }
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Source entry of a role.
    pub fn source(&self, role: &str) -> Option<&ServiceSource> {
        self.definition.services.get(role)
    }

    /// Configuration of a role.
    ///
    /// # Errors
    ///
    /// Returns a resolution error for an unknown role.
    pub fn service(&self, role: &str) -> Result<&ServiceConfig> {
        self.services.get(role).ok_or_else(|| StratusError::Resolution {
            dependency: role.to_string(),
            message: "no such service".into(),
        })
    }

    /// Application-scope dependencies of the lifecycle.
    pub fn app_dependencies(&self, lifecycle: Lifecycle) -> &[DependencyDescriptor] {
        match lifecycle {
            Lifecycle::Local => self.definition.local_dependencies(),
            Lifecycle::Remote => self.definition.remote_dependencies(),
        }
    }

    /// Service-scope dependencies of a role that do not shadow an
    /// application-scope dependency of the same name.
    pub fn service_dependencies(&self, role: &str, lifecycle: Lifecycle) -> Vec<&DependencyDescriptor> {
        let Some(config) = self.services.get(role) else {
            return Vec::new();
        };
        let app_names: HashSet<&str> = self
            .app_dependencies(lifecycle)
            .iter()
            .map(|dep| dep.name.as_str())
            .collect();
        let declared = match lifecycle {
            Lifecycle::Local => &config.local.dependencies,
            Lifecycle::Remote => &config.remote.dependencies,
        };
        declared
            .iter()
            .filter(|dep| {
                let shadowed = app_names.contains(dep.name.as_str());
                if shadowed {
                    tracing::debug!(role, dependency = %dep, "application-scope dependency takes precedence");
                }
                !shadowed
            })
            .collect()
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| StratusError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|source| StratusError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, body).expect("write");
    }

    #[test]
    fn load_reads_internal_and_external_services() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "application.yml",
            r"
name: todo-app
version: 1.0.0
services:
  web:
    location: ./web
  proxy:
    docker-image: nginx:1.13
local:
  dependencies:
    - name: exocom
      version: 0.26.1
",
        );
        write(tmp.path(), "web/service.yml", "type: public\ndevelopment:\n  port: 3000\n");

        let ctx = AppContext::load(tmp.path()).expect("load");
        assert_eq!(ctx.name(), "todo-app");
        assert_eq!(ctx.services.len(), 2);
        assert_eq!(ctx.service("web").expect("web").development.port, Some(3000));
        assert_eq!(ctx.service("proxy").expect("proxy"), &ServiceConfig::default());
        assert_eq!(ctx.app_dependencies(Lifecycle::Local).len(), 1);
        assert!(ctx.app_dependencies(Lifecycle::Remote).is_empty());
    }

    #[test]
    fn load_reports_missing_service_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "application.yml",
            "name: todo-app\nservices:\n  web:\n    location: ./web\n",
        );
        let err = AppContext::load(tmp.path()).unwrap_err();
        assert!(matches!(err, StratusError::Io { .. }), "got: {err}");
    }

    #[test]
    fn service_dependencies_drop_app_scope_names() {
        let mut definition = ApplicationDefinition {
            name: "todo-app".into(),
            ..ApplicationDefinition::default()
        };
        definition
            .local
            .dependencies
            .push(DependencyDescriptor::new("exocom", "0.26.1"));
        let mut web = ServiceConfig::default();
        web.local.dependencies.push(DependencyDescriptor::new("exocom", "0.22.0"));
        web.local.dependencies.push(DependencyDescriptor::new("mongo", "3.4.0"));
        let mut services = BTreeMap::new();
        let _ = services.insert("web".to_string(), web);
        let ctx = AppContext::from_parts("/apps/todo", definition, services);

        let deps = ctx.service_dependencies("web", Lifecycle::Local);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "mongo");
        assert!(ctx.service_dependencies("missing", Lifecycle::Local).is_empty());
    }
}
