//! The application definition (`application.yml`) and its invariants.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dependency::DependencyDescriptor;
use crate::error::{Result, StratusError};

/// Root of `application.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApplicationDefinition {
    /// Application name, lowercase alphanumerics separated by single hyphens.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Free-form description.
    pub description: String,
    /// Service role to source mapping. Keys are kept sorted.
    pub services: BTreeMap<String, ServiceSource>,
    /// Development-time settings.
    pub local: AppLocalConfig,
    /// Deploy-time settings.
    pub remote: AppRemoteConfig,
}

/// `local` block of `application.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppLocalConfig {
    /// Dependencies shared by all services during local runs.
    pub dependencies: Vec<DependencyDescriptor>,
}

/// `remote` block of `application.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppRemoteConfig {
    /// Dependencies shared by all services once deployed.
    pub dependencies: Vec<DependencyDescriptor>,
    /// Public DNS name of the application.
    pub url: String,
    /// Cloud account the application deploys into.
    pub account_id: String,
    /// Cloud region.
    pub region: String,
    /// Certificate used by public load balancers.
    pub ssl_certificate_arn: String,
}

impl AppRemoteConfig {
    /// Checks that every field needed for a deploy is present.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing field.
    pub fn validate_fields(&self) -> Result<()> {
        let required = [
            ("remote.url", &self.url),
            ("remote.account-id", &self.account_id),
            ("remote.region", &self.region),
            ("remote.ssl-certificate-arn", &self.ssl_certificate_arn),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StratusError::missing_field("application.yml", field));
            }
        }
        Ok(())
    }
}

/// Where a service comes from, plus its message-bus translations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceSource {
    /// Buildable source directory, relative to the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Pre-built external image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
    /// Public/internal message name pairs used by the message bus.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub message_translations: Vec<MessageTranslation>,
}

/// A resolved service source: exactly one of the two origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOrigin<'a> {
    /// Built from a directory inside the application.
    Location(&'a str),
    /// Pulled from a registry.
    DockerImage(&'a str),
}

impl ServiceSource {
    /// Returns the single origin of this service.
    ///
    /// # Errors
    ///
    /// Returns a validation error if both or neither of `location` and
    /// `docker-image` are set.
    pub fn origin(&self, role: &str) -> Result<ServiceOrigin<'_>> {
        match (self.location.as_deref(), self.docker_image.as_deref()) {
            (Some(location), None) if !location.is_empty() => Ok(ServiceOrigin::Location(location)),
            (None, Some(image)) if !image.is_empty() => Ok(ServiceOrigin::DockerImage(image)),
            (Some(_), Some(_)) => Err(StratusError::invalid_field(
                "application.yml",
                format!("services.{role}"),
                "location and docker-image are mutually exclusive in",
            )),
            _ => Err(StratusError::invalid_field(
                "application.yml",
                format!("services.{role}"),
                "no location or docker-image listed for",
            )),
        }
    }

    /// Returns the absolute build context for a location-based service.
    pub fn build_context(&self, app_dir: &Path) -> Option<PathBuf> {
        self.location.as_deref().map(|location| {
            let trimmed = location.strip_prefix("./").unwrap_or(location);
            app_dir.join(trimmed)
        })
    }
}

/// A single public/internal message name pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MessageTranslation {
    /// Name used on the bus.
    pub public: String,
    /// Name the service uses internally.
    pub internal: String,
}

impl ApplicationDefinition {
    /// Development-time dependencies shared by all services.
    pub fn local_dependencies(&self) -> &[DependencyDescriptor] {
        &self.local.dependencies
    }

    /// Deploy-time dependencies shared by all services.
    pub fn remote_dependencies(&self) -> &[DependencyDescriptor] {
        &self.remote.dependencies
    }

    /// Service roles in alphabetical order.
    pub fn sorted_roles(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Checks the naming invariants of the definition.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid application name or
    /// service role, or a service with no single origin.
    pub fn validate_names(&self) -> Result<()> {
        if !is_hyphenated_alphanumeric(&self.name, true) {
            return Err(StratusError::invalid_field(
                "application.yml",
                "name",
                format!(
                    "'{}' is invalid: only lowercase alphanumerics separated by single hyphens are allowed in",
                    self.name
                ),
            ));
        }
        for (role, source) in &self.services {
            if !is_hyphenated_alphanumeric(role, false) {
                return Err(StratusError::invalid_field(
                    "application.yml",
                    format!("services.{role}"),
                    "only alphanumerics separated by single hyphens are allowed in service key",
                ));
            }
            let _ = source.origin(role)?;
        }
        Ok(())
    }
}

/// Matches `^[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$`, or its lowercase form.
pub fn is_hyphenated_alphanumeric(value: &str, lowercase_only: bool) -> bool {
    !value.is_empty()
        && value.split('-').all(|segment| {
            !segment.is_empty()
                && segment.chars().all(|c| {
                    c.is_ascii_digit()
                        || if lowercase_only {
                            c.is_ascii_lowercase()
                        } else {
                            c.is_ascii_alphabetic()
                        }
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(location: Option<&str>, image: Option<&str>) -> ServiceSource {
        ServiceSource {
            location: location.map(Into::into),
            docker_image: image.map(Into::into),
            message_translations: Vec::new(),
        }
    }

    #[test]
    fn hyphenated_names() {
        assert!(is_hyphenated_alphanumeric("todo-service", true));
        assert!(is_hyphenated_alphanumeric("Users-Service2", false));
        assert!(!is_hyphenated_alphanumeric("Users-Service2", true));
        assert!(!is_hyphenated_alphanumeric("bad--name", false));
        assert!(!is_hyphenated_alphanumeric("-leading", false));
        assert!(!is_hyphenated_alphanumeric("trailing-", false));
        assert!(!is_hyphenated_alphanumeric("invalid-service!", false));
        assert!(!is_hyphenated_alphanumeric("", false));
    }

    #[test]
    fn invalid_app_name_is_rejected() {
        let def = ApplicationDefinition {
            name: "invalid app".into(),
            ..ApplicationDefinition::default()
        };
        let msg = def.validate_names().unwrap_err().to_string();
        assert!(msg.contains("'invalid app' is invalid"), "got: {msg}");
    }

    #[test]
    fn invalid_service_role_is_rejected() {
        let mut def = ApplicationDefinition {
            name: "todo-app".into(),
            ..ApplicationDefinition::default()
        };
        let _ = def
            .services
            .insert("invalid-service!".into(), service(Some("./x"), None));
        let msg = def.validate_names().unwrap_err().to_string();
        assert!(msg.contains("services.invalid-service!"), "got: {msg}");
    }

    #[test]
    fn origin_requires_exactly_one_source() {
        assert_eq!(
            service(Some("./web"), None).origin("web").unwrap(),
            ServiceOrigin::Location("./web")
        );
        assert_eq!(
            service(None, Some("nginx:1")).origin("web").unwrap(),
            ServiceOrigin::DockerImage("nginx:1")
        );
        assert!(service(Some("./web"), Some("nginx:1")).origin("web").is_err());
        assert!(service(None, None).origin("web").is_err());
    }

    #[test]
    fn remote_config_reports_first_missing_field() {
        let remote = AppRemoteConfig {
            url: "originate.com".into(),
            account_id: "123".into(),
            region: "us-west-2".into(),
            ..AppRemoteConfig::default()
        };
        let msg = remote.validate_fields().unwrap_err().to_string();
        assert!(msg.contains("'remote.ssl-certificate-arn'"), "got: {msg}");
    }

    #[test]
    fn sorted_roles_are_alphabetical() {
        let mut def = ApplicationDefinition::default();
        for role in ["worker-service-1", "public-service-1", "public-service-2"] {
            let _ = def.services.insert(role.into(), ServiceSource::default());
        }
        assert_eq!(
            def.sorted_roles(),
            vec!["public-service-1", "public-service-2", "worker-service-1"]
        );
    }

    #[test]
    fn build_context_strips_leading_dot_slash() {
        let source = service(Some("./web"), None);
        assert_eq!(
            source.build_context(Path::new("/apps/todo")),
            Some(PathBuf::from("/apps/todo/web"))
        );
    }
}
