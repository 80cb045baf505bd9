//! # stratus-compose
//!
//! Compiles an application definition into a container graph.
//!
//! Handles:
//! - **Routing**: the publish/subscribe table consumed by the message bus.
//! - **Dependency**: kind-based resolution of declared dependencies.
//! - **Partial**: mergeable fragments of the container graph.
//! - **Builder**: per-mode producers of dependency and service partials.
//! - **Env**: layered environment compilation and its wire encoding.
//! - **Endpoints**: internal and external origins of every service.
//! - **Graph**: startup ordering.
//! - **Writer**: the compose file on disk.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod dependency;
pub mod endpoints;
pub mod env;
pub mod graph;
pub mod partial;
pub mod routing;
pub mod writer;
