//! Mergeable fragments of the container graph.
//!
//! A [`ConfigurationPartial`] maps component names to [`ContainerSpec`]s and
//! carries the named volumes those specs reference. Partials form a monoid:
//! [`ConfigurationPartial::empty`] is the identity and
//! [`ConfigurationPartial::merge`] resolves name collisions by letting the
//! right-hand side win.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratus_common::constants::COMPOSE_VERSION;

/// Build instructions for an image produced from source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Build context directory.
    pub context: String,
    /// Dockerfile name, relative to the context.
    pub dockerfile: String,
}

/// One entry of the container graph, serialised with compose field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSpec {
    /// Build instructions, for components built from source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Image reference, for components pulled from a registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Fixed container name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    /// Command overriding the image default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Port mappings (`host:container`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Volume mounts (`source:target`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Legacy links (`container:alias`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// Environment variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Components that must start first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Restart policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

impl ContainerSpec {
    /// Human-readable origin: the image reference or the build context.
    pub fn source_label(&self) -> String {
        match (&self.image, &self.build) {
            (Some(image), _) => image.clone(),
            (None, Some(build)) => format!("build {} ({})", build.context, build.dockerfile),
            (None, None) => "<no image>".to_string(),
        }
    }
}

/// A fragment of the container graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationPartial {
    /// Component name to container spec.
    pub services: BTreeMap<String, ContainerSpec>,
    /// Named volumes referenced by the specs. Concatenated on merge.
    pub volume_names: Vec<String>,
}

impl ConfigurationPartial {
    /// The identity element of [`merge`](Self::merge).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A partial holding a single component.
    pub fn single(name: impl Into<String>, spec: ContainerSpec) -> Self {
        let mut partial = Self::empty();
        let _ = partial.services.insert(name.into(), spec);
        partial
    }

    /// Combines two partials. Entries of `other` replace entries of `self`
    /// with the same name; volume names are concatenated.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for (name, spec) in other.services {
            if self.services.get(&name).is_some_and(|previous| *previous != spec) {
                tracing::warn!(component = %name, "conflicting container specs, keeping the later one");
            }
            let _ = self.services.insert(name, spec);
        }
        self.volume_names.extend(other.volume_names);
        self
    }

    /// Left fold of [`merge`](Self::merge) over `partials`.
    #[must_use]
    pub fn merge_all(partials: impl IntoIterator<Item = Self>) -> Self {
        partials.into_iter().fold(Self::empty(), Self::merge)
    }

    /// Whether the partial holds no components and no volumes.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.volume_names.is_empty()
    }
}

/// The serialisable compose document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Compose format version.
    pub version: String,
    /// Component name to container spec.
    pub services: BTreeMap<String, ContainerSpec>,
    /// Named volumes. Values are always empty.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Option<serde_yaml::Value>>,
}

impl ComposeFile {
    /// Builds the compose document from a fully merged partial.
    pub fn from_partial(partial: &ConfigurationPartial) -> Self {
        Self {
            version: COMPOSE_VERSION.to_string(),
            services: partial.services.clone(),
            volumes: partial
                .volume_names
                .iter()
                .map(|name| (name.clone(), None))
                .collect(),
        }
    }
}
