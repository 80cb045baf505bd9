//! Build modes: which variant of the configuration gets compiled.

use std::fmt;

use crate::constants;
use crate::dependency::Lifecycle;

/// Where the compiled artifacts will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTarget {
    /// The operator's machine, via the local compose graph.
    Local,
    /// The remote infrastructure, via the deploy pipeline.
    Deploy,
}

/// Environment tier whose declared variables are compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentTier {
    /// Interactive development.
    Development,
    /// Test runs.
    Test,
    /// Production builds.
    Production,
}

/// The `(target, mount, environment)` tuple fixed for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildMode {
    /// Where the artifacts run.
    pub target: BuildTarget,
    /// Whether service sources are bind-mounted into their containers.
    pub mount: bool,
    /// Active environment tier.
    pub environment: EnvironmentTier,
}

impl BuildMode {
    /// `local-dev`: development tier, sources mounted.
    pub const fn local_development() -> Self {
        Self {
            target: BuildTarget::Local,
            mount: true,
            environment: EnvironmentTier::Development,
        }
    }

    /// `local-test`: test tier, sources mounted.
    pub const fn local_test() -> Self {
        Self {
            target: BuildTarget::Local,
            mount: true,
            environment: EnvironmentTier::Test,
        }
    }

    /// `local-prod`: production images run locally.
    pub const fn local_production() -> Self {
        Self {
            target: BuildTarget::Local,
            mount: false,
            environment: EnvironmentTier::Production,
        }
    }

    /// `deploy-prod`: production images for the remote infrastructure.
    pub const fn deploy_production() -> Self {
        Self {
            target: BuildTarget::Deploy,
            mount: false,
            environment: EnvironmentTier::Production,
        }
    }

    /// Returns the same mode with mounting switched on or off.
    #[must_use]
    pub const fn with_mount(mut self, mount: bool) -> Self {
        self.mount = mount;
        self
    }

    /// Dependency lifecycle matching this mode.
    pub const fn lifecycle(&self) -> Lifecycle {
        match self.target {
            BuildTarget::Local => Lifecycle::Local,
            BuildTarget::Deploy => Lifecycle::Remote,
        }
    }

    /// Dockerfile used to build internal services.
    pub const fn dockerfile(&self) -> &'static str {
        match self.environment {
            EnvironmentTier::Production => constants::PROD_DOCKERFILE,
            EnvironmentTier::Development | EnvironmentTier::Test => constants::DEV_DOCKERFILE,
        }
    }

    /// Short name of the mode, also used as the artifact subdirectory.
    pub const fn label(&self) -> &'static str {
        match (self.target, self.environment) {
            (BuildTarget::Deploy, _) => "deploy-prod",
            (BuildTarget::Local, EnvironmentTier::Development) => "local-dev",
            (BuildTarget::Local, EnvironmentTier::Test) => "local-test",
            (BuildTarget::Local, EnvironmentTier::Production) => "local-prod",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dockerfile_follows_environment() {
        assert_eq!(BuildMode::local_development().dockerfile(), "Dockerfile.dev");
        assert_eq!(BuildMode::local_test().dockerfile(), "Dockerfile.dev");
        assert_eq!(BuildMode::local_production().dockerfile(), "Dockerfile.prod");
        assert_eq!(BuildMode::deploy_production().dockerfile(), "Dockerfile.prod");
    }

    #[test]
    fn labels_name_all_four_targets() {
        assert_eq!(BuildMode::local_development().to_string(), "local-dev");
        assert_eq!(BuildMode::local_test().label(), "local-test");
        assert_eq!(BuildMode::local_production().label(), "local-prod");
        assert_eq!(BuildMode::deploy_production().label(), "deploy-prod");
    }

    #[test]
    fn deploy_uses_remote_lifecycle() {
        assert_eq!(BuildMode::deploy_production().lifecycle(), Lifecycle::Remote);
        assert_eq!(BuildMode::local_test().lifecycle(), Lifecycle::Local);
    }

    #[test]
    fn with_mount_overrides_flag() {
        assert!(!BuildMode::local_development().with_mount(false).mount);
    }
}
