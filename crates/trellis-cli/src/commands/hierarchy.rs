//! `trellis hierarchy`: Display binding hierarchies.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use trellis_common::constants::DEFAULT_MANIFEST;

/// Arguments for the `hierarchy` command.
#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// Path to the manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Only show the hierarchy of this key (`Name` or `Name::qualifier`).
    #[arg(short, long)]
    pub key: Option<String>,
}

/// Executes the `hierarchy` command.
///
/// Prints one line per bound key, rungs in ascending priority.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or `--key` names an unbound key.
pub fn execute(args: &HierarchyArgs, lenient: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let resolver = super::load_resolver(&args.file, lenient)?;
    match &args.key {
        Some(key) => writeln!(out, "{}", resolver.hierarchy(key)?)?,
        None => {
            let hierarchies = resolver.hierarchies();
            if hierarchies.is_empty() {
                tracing::warn!(path = %args.file.display(), "manifest declares no bindings");
            }
            for hierarchy in hierarchies {
                writeln!(out, "{hierarchy}")?;
            }
        }
    }
    Ok(())
}
