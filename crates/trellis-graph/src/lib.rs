//! # trellis-graph
//!
//! Turns component declarations into a validated instantiation plan.
//!
//! Handles:
//! - **Context**: the classified requirement declaration of one component.
//! - **Resolver**: derives contexts from introspected component shapes.
//! - **Graph**: wires contexts into a dependency graph through binding hierarchies.
//! - **Validator**: detects cycles, separates fatal from resolvable ones, and
//!   orders construction.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod context;
pub mod graph;
pub mod resolver;
pub mod validator;
