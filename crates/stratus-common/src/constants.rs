//! Well-known file names, defaults, and naming helpers.

use std::path::{Path, PathBuf};

/// File name of the application definition.
pub const APPLICATION_FILE: &str = "application.yml";

/// File name of a service's own configuration, relative to its location.
pub const SERVICE_FILE: &str = "service.yml";

/// File name of the generated container graph.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Version field written into generated compose files.
pub const COMPOSE_VERSION: &str = "3";

/// Dockerfile used for development and test builds.
pub const DEV_DOCKERFILE: &str = "Dockerfile.dev";

/// Dockerfile used for production builds (local and deploy).
pub const PROD_DOCKERFILE: &str = "Dockerfile.prod";

/// Directory (relative to the application) holding generated artifacts.
pub const DEFAULT_ARTIFACT_DIR: &str = ".stratus";

/// Directory (relative to the application) holding the infra definition.
pub const DEFAULT_INFRA_DIR: &str = "terraform";

/// Name of the generated infrastructure definition file.
pub const INFRA_FILE: &str = "main.tf";

/// Restart policy applied to dependency containers.
pub const DEPENDENCY_RESTART_POLICY: &str = "on-failure";

/// Mount point of the service source inside development containers.
pub const SOURCE_MOUNT_POINT: &str = "/mnt";

/// First host port handed out to public services in local modes.
pub const FIRST_LOCAL_HOST_PORT: u16 = 3000;

/// Default number of concurrent image publishes.
pub const DEFAULT_PUSH_CONCURRENCY: usize = 4;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stratus";

/// Returns the directory that holds generated artifacts for an application.
pub fn artifact_dir(app_dir: &Path) -> PathBuf {
    app_dir.join(DEFAULT_ARTIFACT_DIR)
}

/// Converts a role or dependency name into an environment variable prefix.
///
/// `users-service` becomes `USERS_SERVICE`.
pub fn env_prefix(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_prefix_uppercases_and_replaces_hyphens() {
        assert_eq!(env_prefix("users-service"), "USERS_SERVICE");
        assert_eq!(env_prefix("exocom"), "EXOCOM");
    }

    #[test]
    fn artifact_dir_is_under_app_dir() {
        let dir = artifact_dir(Path::new("/apps/todo"));
        assert_eq!(dir, PathBuf::from("/apps/todo/.stratus"));
    }
}
