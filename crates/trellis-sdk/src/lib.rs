//! # trellis-sdk
//!
//! Public SDK for using Trellis as a Rust library.
//!
//! Provides three main entry points:
//! - [`ContextBuilder`](builder::ContextBuilder): Fluent API for configuring a scope.
//! - [`Manifest`](manifest::Manifest): Symbolic component and binding declarations in YAML or JSON.
//! - [`GraphResolver`](graph_resolver::GraphResolver): Computes and renders resolution plans.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use trellis_sdk::prelude::*;
//!
//! struct Engine;
//!
//! impl Component for Engine {
//!     fn describe(shape: &mut ShapeBuilder<Self>) {
//!         shape.singleton();
//!     }
//!
//!     fn construct(_: &Arguments) -> Result<Self, BoxError> {
//!         Ok(Self)
//!     }
//! }
//!
//! let context = ContextBuilder::new()
//!     .register::<Engine>()
//!     .build()
//!     .expect("valid scope");
//! let engine: Arc<Engine> = context.get().expect("engine");
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod graph_resolver;
pub mod manifest;

/// The types most applications need.
pub mod prelude {
    pub use trellis_common::config::TrellisConfig;
    pub use trellis_common::error::{BoxError, TrellisError};
    pub use trellis_common::types::{ComponentKey, Requirement, Scope};
    pub use trellis_core::component::{Component, Late, ShapeBuilder};
    pub use trellis_core::provider::Arguments;
    pub use trellis_runtime::context::ApplicationContext;

    pub use crate::builder::ContextBuilder;
    pub use crate::graph_resolver::GraphResolver;
    pub use crate::manifest::Manifest;
}
