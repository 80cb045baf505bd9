//! # stratus-deploy
//!
//! Deploys an application to its remote account.
//!
//! The [`pipeline::Pipeline`] runs nine ordered stages over a shared
//! [`context::DeployContext`]. Stages reach the outside world only through
//! the collaborator traits in [`runtime`], [`infra`] and [`account`];
//! [`adapters`] implements them on top of the docker, terraform and aws
//! CLIs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod account;
pub mod adapters;
pub mod cancel;
pub mod context;
pub mod drift;
pub mod error;
pub mod images;
pub mod infra;
pub mod pipeline;
pub mod runtime;
mod stages;
pub mod validate;
pub mod varflags;
