//! Symbolic scope manifests.
//!
//! A manifest declares components and bindings by name, without Rust types
//! behind them. It is enough to compute and inspect an instantiation plan.
//!
//! ```yaml
//! settings:
//!   strict: true
//! components:
//!   - name: Database
//!     scope: singleton
//!   - name: Repository
//!     requires: [Database]
//!     injects: [Auditor]
//! bindings:
//!   - key: Store
//!     priority: 0
//!     target: Repository
//! ```
//!
//! Requirement strings are `Name` or `Name::qualifier`, optionally followed
//! by `@below` (the rung below the requester's own) or `@<priority>` (the
//! highest rung at or below that priority).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trellis_common::config::TrellisConfig;
use trellis_common::constants::DEFAULT_PRIORITY;
use trellis_common::error::{Result, TrellisError};
use trellis_common::types::{ComponentKey, Requirement, Scope};
use trellis_core::introspection::ComponentShape;
use trellis_core::provider::Provider;
use trellis_runtime::context::ApplicationContext;

/// A complete manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Scope settings.
    pub settings: TrellisConfig,
    /// Declared components.
    pub components: Vec<ComponentSpec>,
    /// Bindings layered on top of the declarations.
    pub bindings: Vec<BindingSpec>,
}

/// One declared component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    /// Component name.
    pub name: String,
    /// Optional qualifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Instance lifetime.
    #[serde(default)]
    pub scope: Scope,
    /// Constructor requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Requirements satisfied after construction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub injects: Vec<String>,
}

/// One binding rung.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    /// Bound key name.
    pub key: String,
    /// Optional qualifier of the bound key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Rung of the binding.
    #[serde(default = "default_priority")]
    pub priority: i64,
    /// Declared component constructed for the key, as `Name` or `Name::qualifier`.
    pub target: String,
}

const fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

impl ComponentSpec {
    /// Returns the key of this component.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        qualified(&self.name, self.qualifier.as_deref())
    }

    /// Builds the symbolic shape of this component.
    ///
    /// # Errors
    ///
    /// Returns an error if a requirement string is malformed.
    pub fn shape(&self) -> Result<ComponentShape> {
        let immediate = self
            .requires
            .iter()
            .map(|s| parse_requirement(s))
            .collect::<Result<Vec<_>>>()?;
        let delayed = self
            .injects
            .iter()
            .map(|s| parse_requirement(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(ComponentShape::symbolic(self.key(), self.scope, immediate, delayed))
    }
}

impl BindingSpec {
    /// Returns the bound key.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        qualified(&self.key, self.qualifier.as_deref())
    }

    /// Returns the key of the target component.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is malformed.
    pub fn target(&self) -> Result<ComponentKey> {
        parse_key(&self.target)
    }
}

impl Manifest {
    /// Parses a YAML manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid manifest.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| TrellisError::Manifest {
            message: e.to_string(),
        })
    }

    /// Parses a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid manifest.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reads a manifest from disk. Files ending in `.json` are parsed as
    /// JSON, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading manifest");
        let content = std::fs::read_to_string(path).map_err(|e| TrellisError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks names, requirement strings, and binding targets.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut declared = HashSet::new();
        for component in &self.components {
            if component.name.trim().is_empty() {
                return Err(manifest_error("component with an empty name"));
            }
            let key = component.key();
            if !declared.insert(key.clone()) {
                return Err(manifest_error(format!("component {key} is declared twice")));
            }
            let _ = component.shape()?;
        }

        let mut rungs = HashSet::new();
        for binding in &self.bindings {
            if binding.key.trim().is_empty() {
                return Err(manifest_error("binding with an empty key"));
            }
            let key = binding.key();
            if !rungs.insert((key.clone(), binding.priority)) {
                return Err(manifest_error(format!(
                    "{key} is bound twice at priority {}",
                    binding.priority
                )));
            }
            let target = binding.target()?;
            if !declared.contains(&target) {
                return Err(manifest_error(format!(
                    "binding for {key} targets undeclared component {target}"
                )));
            }
        }
        self.settings.validate()
    }

    /// Registers every component and binding with `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is invalid.
    pub fn apply(&self, context: &ApplicationContext) -> Result<()> {
        self.validate()?;
        for component in &self.components {
            context.register_shape(component.shape()?);
        }
        for binding in &self.bindings {
            let provider = Provider::context_driven(binding.target()?);
            if context
                .add_binding(binding.key(), binding.priority, provider)
                .is_some()
            {
                tracing::warn!(key = %binding.key(), priority = binding.priority, "binding replaced");
            }
        }
        tracing::debug!(
            components = self.components.len(),
            bindings = self.bindings.len(),
            "manifest applied"
        );
        Ok(())
    }

    /// Builds a fresh context configured by this manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or the manifest are invalid.
    pub fn into_context(&self) -> Result<ApplicationContext> {
        let context = ApplicationContext::with_config(self.settings.clone())?;
        self.apply(&context)?;
        Ok(context)
    }
}

/// Parses `Name` or `Name::qualifier` into a symbolic key.
///
/// # Errors
///
/// Returns an error if the name is empty.
pub fn parse_key(text: &str) -> Result<ComponentKey> {
    let text = text.trim();
    let (name, qualifier) = match text.split_once("::") {
        Some((name, qualifier)) => (name.trim(), Some(qualifier.trim())),
        None => (text, None),
    };
    if name.is_empty() {
        return Err(manifest_error(format!("invalid component reference '{text}'")));
    }
    Ok(qualified(name, qualifier))
}

/// Parses a requirement string such as `Greeter::loud@below` or `Store@0`.
///
/// # Errors
///
/// Returns an error if the key or the rung suffix is malformed.
pub fn parse_requirement(text: &str) -> Result<Requirement> {
    let Some((key, rung)) = text.rsplit_once('@') else {
        return Ok(Requirement::of(parse_key(text)?));
    };
    let key = parse_key(key)?;
    match rung.trim() {
        "below" => Ok(Requirement::below_own(key)),
        ceiling => ceiling
            .parse::<i64>()
            .map(|ceiling| Requirement::at_most(key, ceiling))
            .map_err(|_| manifest_error(format!("invalid rung '{ceiling}' in requirement '{text}'"))),
    }
}

fn qualified(name: &str, qualifier: Option<&str>) -> ComponentKey {
    let key = ComponentKey::symbolic(name.trim());
    match qualifier {
        Some(qualifier) => key.named(qualifier),
        None => key,
    }
}

fn manifest_error(message: impl Into<String>) -> TrellisError {
    TrellisError::Manifest {
        message: message.into(),
    }
}
