//! Container runtime abstraction.

use std::path::Path;

use stratus_common::error::Result;
use stratus_compose::partial::ContainerSpec;

use crate::cancel::CancelToken;

/// Summary of an image known to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// `repository:tag` reference.
    pub reference: String,
    /// Runtime-assigned identifier.
    pub id: String,
}

/// Summary of a container known to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container name.
    pub name: String,
    /// Image the container runs.
    pub image: String,
    /// Human-readable status.
    pub status: String,
}

/// Operations the tool needs from a container runtime.
///
/// Long-running operations take a [`CancelToken`] and stop early when it
/// fires. Implementors own no retry logic.
pub trait ContainerRuntime: Send + Sync {
    /// Pulls an image from its registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull fails or is cancelled.
    fn pull(&self, image: &str, cancel: &CancelToken) -> Result<()>;

    /// Whether the image is present locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn image_exists(&self, image: &str) -> Result<bool>;

    /// Builds `context` with `dockerfile` and tags the result `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails or is cancelled.
    fn build(&self, context: &Path, dockerfile: &str, tag: &str, cancel: &CancelToken) -> Result<()>;

    /// Creates and starts a container, returning its identifier.
    ///
    /// With a `network`, the container joins it and is reachable there by
    /// its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created or started.
    fn create_and_start(&self, name: &str, spec: &ContainerSpec, network: Option<&str>) -> Result<String>;

    /// Follows a container's output until it exits, returning its exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or the wait is cancelled.
    fn wait_for_exit(&self, name: &str, cancel: &CancelToken) -> Result<i64>;

    /// Stops a running container. Stopping an exited container succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    fn stop(&self, name: &str) -> Result<()>;

    /// Removes a stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, name: &str) -> Result<()>;

    /// Creates a bridge network unless one with that name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be created.
    fn create_network(&self, name: &str) -> Result<()>;

    /// Removes a network.
    ///
    /// # Errors
    ///
    /// Returns an error if the network is unknown or still in use.
    fn remove_network(&self, name: &str) -> Result<()>;

    /// Pushes an image to its registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the push fails or is cancelled.
    fn push(&self, image: &str, cancel: &CancelToken) -> Result<()>;

    /// Adds the reference `target` to the image `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source image does not exist.
    fn tag(&self, source: &str, target: &str) -> Result<()>;

    /// Lists local images.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn list_images(&self) -> Result<Vec<ImageInfo>>;

    /// Lists containers, running or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn list_containers(&self) -> Result<Vec<ContainerInfo>>;

    /// Removes dangling images and unused volumes.
    ///
    /// # Errors
    ///
    /// Returns an error if pruning fails.
    fn prune(&self) -> Result<()>;
}
