//! System-wide constants and defaults.

/// Priority assigned to a binding registered without an explicit priority.
pub const DEFAULT_PRIORITY: i64 = -1;

/// Separator between entries in a binding hierarchy's diagnostic string.
pub const HIERARCHY_SEPARATOR: &str = " -> ";

/// Default limit on nested constructions within one scope before the
/// coordinator reports a cycle.
pub const DEFAULT_MAX_CONSTRUCTION_DEPTH: usize = 64;

/// Default manifest file name looked up by the CLI.
pub const DEFAULT_MANIFEST: &str = "trellis.yaml";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "trellis";
