//! Infrastructure definition model and the infra tool abstraction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use stratus_common::context::AppContext;
use stratus_common::dependency::Lifecycle;
use stratus_common::error::Result;
use stratus_common::service::ServiceType;
use stratus_compose::dependency::{self, Dependency};

use crate::cancel::CancelToken;
use crate::context::{ImageMap, LOCK_TABLE, RemoteAccount};

/// Operations the deploy needs from the infrastructure tool.
pub trait InfraTool: Send + Sync {
    /// Reads the definition generated by a previous deploy, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read_existing_definition(&self, dir: &Path) -> Result<Option<String>>;

    /// Renders and writes `definition` into `dir`, returning the rendered text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write_definition(&self, dir: &Path, definition: &InfraDefinition) -> Result<String>;

    /// Initialises remote state handling for `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool exits unsuccessfully.
    fn init(&self, dir: &Path, account: &RemoteAccount) -> Result<()>;

    /// Applies the definition in `dir` with the given `-var` flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool exits unsuccessfully or is cancelled.
    fn apply(&self, dir: &Path, var_flags: &[String], auto_approve: bool, cancel: &CancelToken) -> Result<()>;
}

/// A deployed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceModule {
    /// Service role.
    pub role: String,
    /// Whether the service sits behind a public load balancer.
    pub public: bool,
    /// Reserved CPU units.
    pub cpu: String,
    /// Reserved memory.
    pub memory: String,
    /// Container port.
    pub port: Option<u16>,
    /// Public DNS name.
    pub url: Option<String>,
    /// Health-check path.
    pub health_check: Option<String>,
}

/// A deployed dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyModule {
    /// Dependency name.
    pub name: String,
    /// Whether the dependency runs as a container image.
    pub containerised: bool,
    /// Kind-specific module arguments.
    pub config: BTreeMap<String, String>,
}

/// Everything needed to render the infra definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraDefinition {
    /// Application name.
    pub app_name: String,
    /// Target account.
    pub account: RemoteAccount,
    /// Public DNS name of the application.
    pub url: String,
    /// Certificate used by public load balancers.
    pub ssl_certificate_arn: String,
    /// Services, in role order.
    pub services: Vec<ServiceModule>,
    /// Dependencies, application scope first, deduplicated by name.
    pub dependencies: Vec<DependencyModule>,
    /// Names of every input variable the definition declares.
    pub variables: BTreeSet<String>,
}

impl InfraDefinition {
    /// Builds the model from the application and the published images.
    ///
    /// # Errors
    ///
    /// Returns an error if a service role is unknown.
    pub fn build(app: &AppContext, account: &RemoteAccount, images: &ImageMap) -> Result<Self> {
        let mut variables = BTreeSet::from(["aws_profile".to_string()]);
        let mut services = Vec::new();
        for role in app.definition.sorted_roles() {
            let config = app.service(role)?;
            let _ = variables.insert(format!("{role}_env_vars"));
            variables.extend(config.remote.secrets.iter().cloned());
            services.push(ServiceModule {
                role: role.to_string(),
                public: config.service_type == ServiceType::Public,
                cpu: config.remote.cpu.clone().unwrap_or_default(),
                memory: config.remote.memory.clone().unwrap_or_default(),
                port: config.production.port,
                url: config.remote.url.clone(),
                health_check: config.remote.health_check.clone(),
            });
        }

        let mut dependencies = Vec::new();
        for dep in remote_dependencies(app) {
            let _ = variables.insert(format!("{}_env_vars", dep.name()));
            if let Some(secret) = dep
                .descriptor()
                .config
                .rds
                .as_ref()
                .and_then(|rds| rds.password_secret_name.clone())
            {
                let _ = variables.insert(secret);
            }
            dependencies.push(DependencyModule {
                name: dep.name().to_string(),
                containerised: dep.has_container_config(),
                config: dep.deployment_config(),
            });
        }
        variables.extend(images.keys().map(|name| format!("{name}_docker_image")));

        Ok(Self {
            app_name: app.name().to_string(),
            account: account.clone(),
            url: app.definition.remote.url.clone(),
            ssl_certificate_arn: app.definition.remote.ssl_certificate_arn.clone(),
            services,
            dependencies,
            variables,
        })
    }

    /// Renders the definition as HCL.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let account = &self.account;
        let _ = writeln!(out, "terraform {{");
        let _ = writeln!(out, "  backend \"s3\" {{");
        let _ = writeln!(out, "    bucket         = \"{}\"", account.state_bucket());
        let _ = writeln!(out, "    key            = \"terraform.tfstate\"");
        let _ = writeln!(out, "    region         = \"{}\"", account.region);
        let _ = writeln!(out, "    dynamodb_table = \"{LOCK_TABLE}\"");
        let _ = writeln!(out, "  }}");
        let _ = writeln!(out, "}}\n");

        let _ = writeln!(out, "provider \"aws\" {{");
        let _ = writeln!(out, "  region              = \"{}\"", account.region);
        let _ = writeln!(out, "  profile             = \"${{var.aws_profile}}\"");
        let _ = writeln!(out, "  allowed_account_ids = [\"{}\"]", account.account_id);
        let _ = writeln!(out, "}}\n");

        for variable in &self.variables {
            let _ = writeln!(out, "variable \"{variable}\" {{}}\n");
        }

        let _ = writeln!(out, "module \"aws\" {{");
        let _ = writeln!(out, "  source              = \"./modules/aws\"");
        let _ = writeln!(out, "  name                = \"{}\"", self.app_name);
        let _ = writeln!(out, "  region              = \"{}\"", account.region);
        let _ = writeln!(out, "  url                 = \"{}\"", self.url);
        let _ = writeln!(out, "  ssl_certificate_arn = \"{}\"", self.ssl_certificate_arn);
        let _ = writeln!(out, "}}");

        for service in &self.services {
            let kind = if service.public { "public-service" } else { "worker-service" };
            let _ = writeln!(out, "\nmodule \"{}\" {{", service.role);
            let _ = writeln!(out, "  source       = \"./modules/{kind}\"");
            let _ = writeln!(out, "  name         = \"{}\"", service.role);
            let _ = writeln!(out, "  cpu          = \"{}\"", service.cpu);
            let _ = writeln!(out, "  memory       = \"{}\"", service.memory);
            let _ = writeln!(out, "  docker_image = \"${{var.{}_docker_image}}\"", service.role);
            let _ = writeln!(out, "  env_vars     = \"${{var.{}_env_vars}}\"", service.role);
            if let Some(port) = service.port {
                let _ = writeln!(out, "  port         = \"{port}\"");
            }
            if let Some(url) = &service.url {
                let _ = writeln!(out, "  url          = \"{url}\"");
            }
            if let Some(health_check) = &service.health_check {
                let _ = writeln!(out, "  health_check = \"{health_check}\"");
            }
            let _ = writeln!(out, "}}");
        }

        for dep in &self.dependencies {
            let _ = writeln!(out, "\nmodule \"{}\" {{", dep.name);
            let _ = writeln!(out, "  source   = \"./modules/dependencies/{}\"", dep.name);
            let _ = writeln!(out, "  env_vars = \"${{var.{}_env_vars}}\"", dep.name);
            if dep.containerised && self.variables.contains(&format!("{}_docker_image", dep.name)) {
                let _ = writeln!(out, "  docker_image = \"${{var.{}_docker_image}}\"", dep.name);
            }
            for (key, value) in &dep.config {
                let _ = writeln!(out, "  {key} = \"{value}\"");
            }
            let _ = writeln!(out, "}}");
        }
        out
    }
}

/// Every remote dependency: application scope, then each service's private
/// ones, keeping the first occurrence of each name.
pub fn remote_dependencies(app: &AppContext) -> Vec<Dependency<'_>> {
    let mut seen = BTreeSet::new();
    let mut deps = dependency::app_dependencies(app, Lifecycle::Remote);
    for role in app.definition.services.keys() {
        deps.extend(dependency::service_dependencies(app, role, Lifecycle::Remote));
    }
    deps.retain(|dep| seen.insert(dep.name().to_string()));
    deps
}
