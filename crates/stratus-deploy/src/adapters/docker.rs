//! [`ContainerRuntime`] backed by the `docker` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use stratus_common::error::{Result, StratusError};
use stratus_compose::partial::ContainerSpec;

use super::process::{command_in, locate, run_captured, run_streaming, run_with_input};
use crate::cancel::CancelToken;
use crate::runtime::{ContainerInfo, ContainerRuntime, ImageInfo};

const TOOL: &str = "docker";

/// Drives the local docker daemon through its CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Locates the docker binary on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an external-tool error if the binary cannot be found.
    pub fn locate(binary: &str) -> Result<Self> {
        Ok(Self {
            binary: locate(TOOL, binary)?,
        })
    }

    fn command<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Command {
        let mut command = Command::new(&self.binary);
        let _ = command.args(args);
        command
    }

    /// Logs in to `registry` with a password read from stdin.
    ///
    /// # Errors
    ///
    /// Returns an external-tool error if the registry rejects the login.
    pub fn login(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        let command = self.command(["login", "--username", username, "--password-stdin", registry]);
        let _ = run_with_input(TOOL, command, Some(password))?;
        tracing::info!(registry, "logged in to registry");
        Ok(())
    }
}

/// `docker run` arguments for a spec, image last.
fn run_args(name: &str, spec: &ContainerSpec, network: Option<&str>) -> Result<Vec<String>> {
    let image = spec.image.clone().ok_or_else(|| StratusError::Resolution {
        dependency: name.to_string(),
        message: "container has no image to run".into(),
    })?;
    let mut args = vec!["run".to_string(), "--detach".into(), "--name".into(), name.to_string()];
    if let Some(network) = network {
        args.extend(["--network".into(), network.to_string()]);
    }
    for port in &spec.ports {
        args.extend(["--publish".into(), port.clone()]);
    }
    for volume in &spec.volumes {
        args.extend(["--volume".into(), volume.clone()]);
    }
    for link in &spec.links {
        args.extend(["--link".into(), link.clone()]);
    }
    for (key, value) in &spec.environment {
        args.extend(["--env".into(), format!("{key}={value}")]);
    }
    if let Some(restart) = &spec.restart {
        args.extend(["--restart".into(), restart.clone()]);
    }
    args.push(image);
    if let Some(command) = &spec.command {
        args.extend(command.split_whitespace().map(str::to_string));
    }
    Ok(args)
}

/// Reads the status printed by `docker wait`.
fn parse_exit_code(name: &str, status: &str) -> Result<i64> {
    status
        .trim()
        .parse()
        .map_err(|_| StratusError::tool(TOOL, format!("unexpected exit status '{}' for {name}", status.trim())))
}

fn parse_images(listing: &str) -> Vec<ImageInfo> {
    listing
        .lines()
        .filter_map(|line| {
            let (reference, id) = line.split_once('\t')?;
            Some(ImageInfo {
                reference: reference.to_string(),
                id: id.to_string(),
            })
        })
        .collect()
}

fn parse_containers(listing: &str) -> Vec<ContainerInfo> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            Some(ContainerInfo {
                name: fields.next()?.to_string(),
                image: fields.next()?.to_string(),
                status: fields.next()?.to_string(),
            })
        })
        .collect()
}

impl ContainerRuntime for DockerCli {
    fn pull(&self, image: &str, cancel: &CancelToken) -> Result<()> {
        tracing::info!(image, "pulling image");
        run_streaming(TOOL, self.command(["pull", image]), cancel)
    }

    fn image_exists(&self, image: &str) -> Result<bool> {
        let listing = run_captured(TOOL, self.command(["images", "--quiet", image]))?;
        Ok(!listing.trim().is_empty())
    }

    fn build(&self, context: &Path, dockerfile: &str, tag: &str, cancel: &CancelToken) -> Result<()> {
        tracing::info!(context = %context.display(), tag, "building image");
        let mut command = command_in(&self.binary, context);
        let _ = command.args(["build", "--file", dockerfile, "--tag", tag, "."]);
        run_streaming(TOOL, command, cancel)
    }

    fn create_and_start(&self, name: &str, spec: &ContainerSpec, network: Option<&str>) -> Result<String> {
        let args = run_args(name, spec, network)?;
        let id = run_captured(TOOL, self.command(args.iter().map(String::as_str)))?;
        tracing::info!(container = name, "container started");
        Ok(id.trim().to_string())
    }

    fn wait_for_exit(&self, name: &str, cancel: &CancelToken) -> Result<i64> {
        run_streaming(TOOL, self.command(["logs", "--follow", name]), cancel)?;
        let status = run_captured(TOOL, self.command(["wait", name]))?;
        parse_exit_code(name, &status)
    }

    fn stop(&self, name: &str) -> Result<()> {
        let _ = run_captured(TOOL, self.command(["stop", name]))?;
        tracing::info!(container = name, "container stopped");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let _ = run_captured(TOOL, self.command(["rm", "--volumes", name]))?;
        Ok(())
    }

    fn create_network(&self, name: &str) -> Result<()> {
        let filter = format!("name=^{name}$");
        let existing = run_captured(TOOL, self.command(["network", "ls", "--quiet", "--filter", filter.as_str()]))?;
        if !existing.trim().is_empty() {
            tracing::debug!(network = name, "network already exists");
            return Ok(());
        }
        let _ = run_captured(TOOL, self.command(["network", "create", name]))?;
        tracing::info!(network = name, "network created");
        Ok(())
    }

    fn remove_network(&self, name: &str) -> Result<()> {
        let _ = run_captured(TOOL, self.command(["network", "rm", name]))?;
        tracing::info!(network = name, "network removed");
        Ok(())
    }

    fn push(&self, image: &str, cancel: &CancelToken) -> Result<()> {
        tracing::info!(image, "pushing image");
        run_streaming(TOOL, self.command(["push", image]), cancel)
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        let _ = run_captured(TOOL, self.command(["tag", source, target]))?;
        Ok(())
    }

    fn list_images(&self) -> Result<Vec<ImageInfo>> {
        let listing = run_captured(
            TOOL,
            self.command(["images", "--format", "{{.Repository}}:{{.Tag}}\t{{.ID}}"]),
        )?;
        Ok(parse_images(&listing))
    }

    fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let listing = run_captured(
            TOOL,
            self.command(["ps", "--all", "--format", "{{.Names}}\t{{.Image}}\t{{.Status}}"]),
        )?;
        Ok(parse_containers(&listing))
    }

    fn prune(&self) -> Result<()> {
        let _ = run_captured(TOOL, self.command(["image", "prune", "--force"]))?;
        let _ = run_captured(TOOL, self.command(["volume", "prune", "--force"]))?;
        tracing::info!("pruned dangling images and unused volumes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn run_args_cover_spec_fields() {
        let spec = ContainerSpec {
            image: Some("redis:4.0".into()),
            ports: vec!["6379:6379".into()],
            volumes: vec!["redis__data:/data".into()],
            environment: BTreeMap::from([("A".to_string(), "1".to_string())]),
            restart: Some("on-failure".into()),
            command: Some("redis-server --appendonly yes".into()),
            ..ContainerSpec::default()
        };
        let args = run_args("redis4.0", &spec, Some("todo-app")).expect("args");
        assert_eq!(
            args,
            vec![
                "run",
                "--detach",
                "--name",
                "redis4.0",
                "--network",
                "todo-app",
                "--publish",
                "6379:6379",
                "--volume",
                "redis__data:/data",
                "--env",
                "A=1",
                "--restart",
                "on-failure",
                "redis:4.0",
                "redis-server",
                "--appendonly",
                "yes",
            ]
        );
    }

    #[test]
    fn run_needs_an_image() {
        assert!(run_args("web", &ContainerSpec::default(), None).is_err());
    }

    #[test]
    fn run_without_network_uses_the_default_bridge() {
        let spec = ContainerSpec {
            image: Some("nginx".into()),
            ..ContainerSpec::default()
        };
        let args = run_args("web", &spec, None).expect("args");
        assert!(!args.iter().any(|arg| arg == "--network"));
    }

    #[test]
    fn exit_codes_parse_from_wait_output() {
        assert_eq!(parse_exit_code("api", "0\n").expect("code"), 0);
        assert_eq!(parse_exit_code("api", "137\n").expect("code"), 137);
        assert!(parse_exit_code("api", "Error: No such container").is_err());
    }

    #[test]
    fn parses_listings() {
        let images = parse_images("redis:4.0\tabc123\nbroken-line\n");
        assert_eq!(
            images,
            vec![ImageInfo {
                reference: "redis:4.0".into(),
                id: "abc123".into()
            }]
        );
        let containers = parse_containers("web\ttodo-web\tUp 3 minutes\n");
        assert_eq!(containers[0].status, "Up 3 minutes");
    }
}
