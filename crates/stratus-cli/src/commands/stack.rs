//! Containers started for a local run, on their own project network.

use stratus_common::context::AppContext;
use stratus_compose::partial::{ConfigurationPartial, ContainerSpec};
use stratus_deploy::cancel::CancelToken;
use stratus_deploy::runtime::ContainerRuntime;

/// Components started on a shared network, torn down in reverse start order.
pub struct LocalStack<'a> {
    runtime: &'a dyn ContainerRuntime,
    project: String,
    started: Vec<String>,
}

impl<'a> LocalStack<'a> {
    /// Creates the project network and starts every component of `order`.
    ///
    /// Containers left over from an earlier detached run are removed first.
    /// If a component fails to start, whatever was already started is torn
    /// down before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be created, or a component
    /// fails to build, pull or start.
    pub fn up(
        runtime: &'a dyn ContainerRuntime,
        ctx: &AppContext,
        project: &str,
        partial: &ConfigurationPartial,
        order: &[String],
        cancel: &CancelToken,
    ) -> anyhow::Result<Self> {
        remove_stale(runtime, partial)?;
        runtime.create_network(project)?;
        let mut stack = Self {
            runtime,
            project: project.to_string(),
            started: Vec::new(),
        };
        for name in order {
            if let Err(e) = stack.start(ctx, partial, name, cancel) {
                if let Err(teardown) = stack.teardown() {
                    tracing::warn!(error = %teardown, "teardown after failed start was incomplete");
                }
                return Err(e);
            }
        }
        Ok(stack)
    }

    /// Builds or pulls one component's image, then starts it on the network.
    ///
    /// Returns the container name.
    ///
    /// # Errors
    ///
    /// Returns an error if the run was interrupted, or the image or
    /// container cannot be prepared.
    pub fn start(
        &mut self,
        ctx: &AppContext,
        partial: &ConfigurationPartial,
        name: &str,
        cancel: &CancelToken,
    ) -> anyhow::Result<String> {
        if cancel.is_cancelled() {
            anyhow::bail!("interrupted before starting {name}");
        }
        let Some(spec) = partial.services.get(name) else {
            anyhow::bail!("no component named {name}");
        };
        let spec = self.prepare_image(ctx, name, spec, cancel)?;
        let container = container_name(name, &spec);
        let id = self.runtime.create_and_start(&container, &spec, Some(&self.project))?;
        self.started.push(container.clone());
        tracing::info!(component = %name, id = %id, "component started");
        eprintln!("  + {name}");
        Ok(container)
    }

    /// Number of containers started so far.
    pub fn container_count(&self) -> usize {
        self.started.len()
    }

    /// Stops and removes every started container, newest first, then the
    /// network.
    ///
    /// Keeps going past individual failures.
    ///
    /// # Errors
    ///
    /// Returns the first failure once every step has been attempted.
    pub fn teardown(self) -> anyhow::Result<()> {
        let mut first_error = None;
        for container in self.started.iter().rev() {
            let result = self.runtime.stop(container).and_then(|()| self.runtime.remove(container));
            if let Err(e) = result {
                tracing::warn!(container = %container, error = %e, "container teardown failed");
                let _ = first_error.get_or_insert(e);
            } else {
                eprintln!("  - {container}");
            }
        }
        if let Err(e) = self.runtime.remove_network(&self.project) {
            tracing::warn!(network = %self.project, error = %e, "network removal failed");
            let _ = first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Returns `spec` with an image that exists locally.
    fn prepare_image(
        &self,
        ctx: &AppContext,
        name: &str,
        spec: &ContainerSpec,
        cancel: &CancelToken,
    ) -> anyhow::Result<ContainerSpec> {
        let mut spec = spec.clone();
        if let Some(build) = &spec.build {
            let tag = format!("{}-{name}", self.project);
            self.runtime
                .build(&ctx.dir.join(&build.context), &build.dockerfile, &tag, cancel)?;
            spec.image = Some(tag);
        } else if let Some(image) = &spec.image {
            if !self.runtime.image_exists(image)? {
                self.runtime.pull(image, cancel)?;
            }
        }
        Ok(spec)
    }
}

fn container_name(name: &str, spec: &ContainerSpec) -> String {
    spec.container_name.clone().unwrap_or_else(|| name.to_string())
}

/// Removes containers whose names the graph is about to use.
fn remove_stale(runtime: &dyn ContainerRuntime, partial: &ConfigurationPartial) -> anyhow::Result<()> {
    let wanted: Vec<String> = partial
        .services
        .iter()
        .map(|(name, spec)| container_name(name, spec))
        .collect();
    for existing in runtime.list_containers()? {
        if wanted.contains(&existing.name) {
            tracing::info!(container = %existing.name, "removing leftover container");
            runtime.stop(&existing.name)?;
            runtime.remove(&existing.name)?;
        }
    }
    Ok(())
}
