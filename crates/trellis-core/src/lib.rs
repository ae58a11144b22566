//! # trellis-core
//!
//! Binding primitives for the Trellis engine.
//!
//! This crate provides:
//! - **Instance**: type-erased, shareable component instances and upcast views.
//! - **Provider**: the closed set of strategies that produce an instance.
//! - **Hierarchy**: per-key, priority-ordered registries of providers.
//! - **Component**: the trait user types implement to describe their
//!   constructor arguments and injection points.
//! - **Introspection**: the seam through which component shapes are looked up.
//! - **Placeholder**: forwarding cells used to break resolvable cycles.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod component;
pub mod hierarchy;
pub mod instance;
pub mod introspection;
pub mod placeholder;
pub mod provider;
