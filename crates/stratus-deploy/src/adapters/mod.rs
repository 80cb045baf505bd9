//! Collaborator implementations backed by external CLIs.

pub mod aws;
pub mod docker;
pub mod process;
pub mod terraform;

pub use aws::AwsCli;
pub use docker::DockerCli;
pub use terraform::TerraformCli;
