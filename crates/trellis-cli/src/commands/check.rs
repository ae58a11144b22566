//! `trellis check`: Validate a manifest.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use trellis_common::constants::DEFAULT_MANIFEST;

use crate::output;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `check` command.
///
/// # Errors
///
/// Returns an error if the manifest is invalid, contains a fatal cycle, or
/// (unless lenient) leaves a requirement unresolved.
pub fn execute(args: &CheckArgs, lenient: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let resolver = super::load_resolver(&args.file, lenient)?;
    resolver.check()?;

    let context = resolver.context();
    writeln!(
        out,
        "{}: ok ({}, {})",
        args.file.display(),
        output::counted(context.registry().len(), "component"),
        output::counted(context.bindings().len(), "bound key")
    )?;
    Ok(())
}
