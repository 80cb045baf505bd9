//! Internal and external origins of every service for a build mode.

use std::collections::BTreeMap;

use stratus_common::constants::{FIRST_LOCAL_HOST_PORT, env_prefix};
use stratus_common::context::AppContext;
use stratus_common::mode::{BuildMode, BuildTarget};
use stratus_common::service::ServiceType;

/// Where a single service can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Port the service listens on inside its container.
    pub container_port: u16,
    /// Origin reachable from other services.
    pub internal_origin: String,
    /// Origin reachable from outside the application, for public services.
    pub external_origin: Option<String>,
    /// Host port published locally, for public services.
    pub host_port: Option<u16>,
}

/// Endpoints of every service that declares a port for the mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEndpoints {
    endpoints: BTreeMap<String, ServiceEndpoint>,
}

impl ServiceEndpoints {
    /// Computes the endpoints of every service. Host ports are handed out
    /// to public services in role order, starting at 3000.
    pub fn new(ctx: &AppContext, mode: BuildMode) -> Self {
        let mut endpoints = BTreeMap::new();
        let mut next_host_port = FIRST_LOCAL_HOST_PORT;
        for (role, config) in &ctx.services {
            let Some(port) = config.port_for(mode.environment) else {
                continue;
            };
            let public = config.service_type == ServiceType::Public;
            let (internal_origin, external_origin, host_port) = match mode.target {
                BuildTarget::Local => {
                    let host_port = public.then(|| {
                        let allocated = next_host_port;
                        next_host_port = next_host_port.saturating_add(1);
                        allocated
                    });
                    (
                        format!("http://{role}:{port}"),
                        host_port.map(|p| format!("http://localhost:{p}")),
                        host_port,
                    )
                }
                BuildTarget::Deploy => {
                    let external = config
                        .remote
                        .url
                        .as_deref()
                        .filter(|url| public && !url.is_empty())
                        .map(|url| format!("https://{url}"));
                    (format!("http://{role}.{}.local:{port}", ctx.name()), external, None)
                }
            };
            let _ = endpoints.insert(
                role.clone(),
                ServiceEndpoint {
                    container_port: port,
                    internal_origin,
                    external_origin,
                    host_port,
                },
            );
        }
        Self { endpoints }
    }

    /// Published port mapping (`host:container`) of a role.
    pub fn port_mapping(&self, role: &str) -> Option<String> {
        let endpoint = self.endpoints.get(role)?;
        endpoint
            .host_port
            .map(|host| format!("{host}:{}", endpoint.container_port))
    }

    /// Origins of every other service, keyed `<ROLE>_INTERNAL_ORIGIN` and
    /// `<ROLE>_EXTERNAL_ORIGIN`.
    pub fn env_for(&self, role: &str) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        for (other, endpoint) in self.endpoints.iter().filter(|(other, _)| *other != role) {
            let prefix = env_prefix(other);
            let _ = vars.insert(format!("{prefix}_INTERNAL_ORIGIN"), endpoint.internal_origin.clone());
            if let Some(external) = &endpoint.external_origin {
                let _ = vars.insert(format!("{prefix}_EXTERNAL_ORIGIN"), external.clone());
            }
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use stratus_common::app::ApplicationDefinition;
    use stratus_common::service::ServiceConfig;

    use super::*;

    fn ctx() -> AppContext {
        let definition = ApplicationDefinition {
            name: "todo-app".into(),
            ..ApplicationDefinition::default()
        };
        let mut services = BTreeMap::new();
        for (role, public) in [("web", true), ("api", true), ("worker", false)] {
            let mut config = ServiceConfig::default();
            if public {
                config.service_type = ServiceType::Public;
                config.remote.url = Some(format!("{role}.example.com"));
            }
            config.development.port = Some(8080);
            config.production.port = Some(80);
            let _ = services.insert(role.to_string(), config);
        }
        AppContext::from_parts("/apps/todo", definition, services)
    }

    #[test]
    fn local_host_ports_follow_role_order() {
        let endpoints = ServiceEndpoints::new(&ctx(), BuildMode::local_development());
        assert_eq!(endpoints.port_mapping("api").as_deref(), Some("3000:8080"));
        assert_eq!(endpoints.port_mapping("web").as_deref(), Some("3001:8080"));
        assert_eq!(endpoints.port_mapping("worker"), None);
    }

    #[test]
    fn env_excludes_own_origins() {
        let endpoints = ServiceEndpoints::new(&ctx(), BuildMode::local_development());
        let env = endpoints.env_for("web");
        assert_eq!(env["API_INTERNAL_ORIGIN"], "http://api:8080");
        assert_eq!(env["API_EXTERNAL_ORIGIN"], "http://localhost:3000");
        assert_eq!(env["WORKER_INTERNAL_ORIGIN"], "http://worker:8080");
        assert!(!env.contains_key("WORKER_EXTERNAL_ORIGIN"));
        assert!(!env.contains_key("WEB_INTERNAL_ORIGIN"));
    }

    #[test]
    fn deploy_uses_private_dns_and_public_url() {
        let endpoints = ServiceEndpoints::new(&ctx(), BuildMode::deploy_production());
        let env = endpoints.env_for("worker");
        assert_eq!(env["WEB_INTERNAL_ORIGIN"], "http://web.todo-app.local:80");
        assert_eq!(env["WEB_EXTERNAL_ORIGIN"], "https://web.example.com");
        assert_eq!(endpoints.port_mapping("web"), None);
    }
}
