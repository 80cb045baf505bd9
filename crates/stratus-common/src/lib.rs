//! # stratus-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the entire Stratus workspace.
//!
//! This crate is the leaf of the dependency graph. It parses the
//! application and service definitions and exposes the build modes the
//! compilers are parameterised by.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod app;
pub mod config;
pub mod constants;
pub mod context;
pub mod dependency;
pub mod error;
pub mod mode;
pub mod service;
