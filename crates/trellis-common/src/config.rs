//! Configuration model for a Trellis scope.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_CONSTRUCTION_DEPTH;
use crate::error::{Result, TrellisError};

/// Settings that govern how one scope resolves its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    /// Whether unresolved requirements are errors (`true`) or skipped.
    pub strict: bool,
    /// Maximum nesting of constructions before a cycle is reported.
    pub max_construction_depth: usize,
}

impl TrellisConfig {
    /// Returns a copy with strict mode toggled.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_construction_depth` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_construction_depth == 0 {
            return Err(TrellisError::Config {
                message: "max_construction_depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            strict: true,
            max_construction_depth: DEFAULT_MAX_CONSTRUCTION_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let config = TrellisConfig::default();
        assert!(config.strict);
        assert_eq!(config.max_construction_depth, DEFAULT_MAX_CONSTRUCTION_DEPTH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: TrellisConfig = serde_json::from_str(r#"{"strict": false}"#).expect("parse");
        assert!(!config.strict);
        assert_eq!(config.max_construction_depth, DEFAULT_MAX_CONSTRUCTION_DEPTH);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let config = TrellisConfig {
            max_construction_depth: 0,
            ..TrellisConfig::default()
        };
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("max_construction_depth"), "got: {msg}");
    }
}
