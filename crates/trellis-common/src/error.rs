//! Unified error types for the Trellis workspace.
//!
//! The resolution taxonomy (`ComponentResolution`, `CyclicComponent`,
//! `ComponentInitialization`) is terminal for the call that raised it: no
//! variant is retried or downgraded by the engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ComponentKey;

/// Boxed error produced by user-supplied constructors and factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// No declaration and no binding exists for a strictly requested key.
    #[error("no declaration or binding found for {key}{}", required_by_suffix(.required_by.as_ref()))]
    ComponentResolution {
        /// The key that could not be resolved.
        key: ComponentKey,
        /// The component whose requirement could not be satisfied, if any.
        required_by: Option<ComponentKey>,
    },

    /// A cycle containing at least one immediate edge.
    #[error(
        "cyclic dependency: {requester} requires {blamed} at construction time (cycle: {})",
        format_chain(.chain)
    )]
    CyclicComponent {
        /// Component whose immediate requirement closes the loop.
        requester: ComponentKey,
        /// Dependency blamed for the cycle.
        blamed: ComponentKey,
        /// Members of the cycle, rotated to start at the smallest key.
        chain: Vec<ComponentKey>,
    },

    /// Construction recursed into itself and no culprit could be identified.
    #[error("unresolvable cycle while constructing {key}, cause unknown")]
    UnresolvableCycle {
        /// Component whose construction recursed.
        key: ComponentKey,
    },

    /// A provider failed while producing an instance.
    #[error("failed to initialize {key}: {source}")]
    ComponentInitialization {
        /// Component that failed to initialize.
        key: ComponentKey,
        /// Original failure raised by the provider.
        source: BoxError,
    },

    /// An instance was produced but is not of the requested type.
    #[error("instance bound to {key} is not a {expected}")]
    TypeMismatch {
        /// Key whose instance had the wrong type.
        key: ComponentKey,
        /// Requested Rust type.
        expected: &'static str,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A manifest could not be interpreted.
    #[error("invalid manifest: {message}")]
    Manifest {
        /// Description of the problem.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl TrellisError {
    /// Returns the key this error is about, when there is one.
    #[must_use]
    pub const fn key(&self) -> Option<&ComponentKey> {
        match self {
            Self::ComponentResolution { key, .. }
            | Self::UnresolvableCycle { key }
            | Self::ComponentInitialization { key, .. }
            | Self::TypeMismatch { key, .. } => Some(key),
            Self::CyclicComponent { requester, .. } => Some(requester),
            Self::Config { .. }
            | Self::Manifest { .. }
            | Self::Io { .. }
            | Self::Serialization { .. } => None,
        }
    }

    /// Returns `true` for the two cycle variants.
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(
            self,
            Self::CyclicComponent { .. } | Self::UnresolvableCycle { .. }
        )
    }
}

fn required_by_suffix(required_by: Option<&ComponentKey>) -> String {
    required_by.map_or_else(String::new, |owner| format!(" (required by {owner})"))
}

/// Renders a cycle as `A -> B -> A`.
#[must_use]
pub fn format_chain(chain: &[ComponentKey]) -> String {
    let mut parts: Vec<String> = chain.iter().map(ToString::to_string).collect();
    if let Some(first) = chain.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TrellisError>;
