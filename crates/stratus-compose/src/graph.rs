//! Startup ordering using `petgraph`.
//!
//! Builds a directed acyclic graph from the `depends_on` edges of a
//! partial and resolves a topological order for bringing components up.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use stratus_common::error::{Result, StratusError};

use crate::partial::ConfigurationPartial;

/// A dependency graph of components.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Adds a component node to the graph.
    pub fn add_component(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns the components with dependencies before their dependents.
    ///
    /// # Errors
    ///
    /// Returns an error naming a component on the cycle if the graph is cyclic.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        petgraph::algo::toposort(&self.graph, None)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                    .collect()
            })
            .map_err(|cycle| StratusError::Resolution {
                dependency: self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default(),
                message: "cyclic dependency detected in component graph".into(),
            })
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Order in which the components of a partial must be started.
///
/// # Errors
///
/// Returns an error if a component depends on an undefined component or
/// if the dependencies are cyclic.
pub fn startup_order(partial: &ConfigurationPartial) -> Result<Vec<String>> {
    let mut graph = DependencyGraph::new();
    let nodes: HashMap<&str, NodeIndex> = partial
        .services
        .keys()
        .map(|name| (name.as_str(), graph.add_component(name.clone())))
        .collect();
    for (name, spec) in &partial.services {
        let dependent = nodes[name.as_str()];
        for target in &spec.depends_on {
            let Some(&dependency) = nodes.get(target.as_str()) else {
                return Err(StratusError::Resolution {
                    dependency: target.clone(),
                    message: format!("'{name}' depends on an undefined component"),
                });
            };
            graph.add_dependency(dependent, dependency);
        }
    }
    graph.resolve_order()
}
