//! # trellis-runtime
//!
//! Resolution for a single scope.
//!
//! Owns everything a scope keeps between calls: binding hierarchies, the
//! component registry, and the singleton cache. Each `get` builds a fresh
//! dependency graph, validates it, and hands the plan to the coordinator.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod binder;
pub mod bindings;
pub mod cache;
pub mod context;
pub mod coordinator;
