//! Fluent API for configuring a scope before its first resolution.

use std::fmt;
use std::sync::Arc;

use trellis_common::config::TrellisConfig;
use trellis_common::error::Result;
use trellis_core::component::Component;
use trellis_core::placeholder::PlaceholderFactory;
use trellis_runtime::context::ApplicationContext;

use crate::manifest::Manifest;

type Step = Box<dyn FnOnce(&ApplicationContext) -> Result<()>>;

/// Builder for an [`ApplicationContext`].
///
/// Registrations run in the order they were added, after the settings have
/// been validated.
pub struct ContextBuilder {
    config: TrellisConfig,
    placeholders: Option<Arc<dyn PlaceholderFactory>>,
    steps: Vec<Step>,
    validate: bool,
}

impl ContextBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TrellisConfig::default(),
            placeholders: None,
            steps: Vec::new(),
            validate: false,
        }
    }

    /// Sets whether unresolved requirements are errors.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Sets the maximum nesting of constructions.
    #[must_use]
    pub const fn max_construction_depth(mut self, depth: usize) -> Self {
        self.config.max_construction_depth = depth;
        self
    }

    /// Replaces all settings.
    #[must_use]
    pub fn config(mut self, config: TrellisConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `placeholders` for resolvable cycles.
    #[must_use]
    pub fn placeholders(mut self, placeholders: Arc<dyn PlaceholderFactory>) -> Self {
        self.placeholders = Some(placeholders);
        self
    }

    /// Registers the component `C`.
    #[must_use]
    pub fn register<C: Component>(self) -> Self {
        self.module(|context| {
            let _ = context.register::<C>();
        })
    }

    /// Runs `configure` against the context, typically to add bindings.
    #[must_use]
    pub fn module(mut self, configure: impl FnOnce(&ApplicationContext) + 'static) -> Self {
        self.steps.push(Box::new(move |context| {
            configure(context);
            Ok(())
        }));
        self
    }

    /// Registers the components and bindings of `manifest`.
    ///
    /// The manifest's settings are ignored; use [`Self::config`] for those.
    #[must_use]
    pub fn manifest(mut self, manifest: Manifest) -> Self {
        self.steps.push(Box::new(move |context| manifest.apply(context)));
        self
    }

    /// Validates the whole scope before returning it.
    #[must_use]
    pub const fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, a manifest is invalid,
    /// or validation was requested and failed.
    pub fn build(self) -> Result<ApplicationContext> {
        let mut context = ApplicationContext::with_config(self.config)?;
        if let Some(placeholders) = self.placeholders {
            context = context.with_placeholders(placeholders);
        }
        let steps = self.steps.len();
        for step in self.steps {
            step(&context)?;
        }
        if self.validate {
            context.validate()?;
        }
        tracing::debug!(steps, components = context.registry().len(), "context built");
        Ok(context)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("config", &self.config)
            .field("steps", &self.steps.len())
            .field("validate", &self.validate)
            .finish_non_exhaustive()
    }
}
