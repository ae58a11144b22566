//! `trellis plan`: Display the instantiation plan of a manifest.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use trellis_common::constants::DEFAULT_MANIFEST;

use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the manifest (YAML, or JSON with a `.json` extension).
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `plan` command.
///
/// Loads the manifest, builds the dependency graph of every declared
/// component and binding, and prints the construction order. Resolvable
/// cycles are listed with their discovery order; unresolved requirements are
/// listed after the steps.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or contains a fatal cycle.
pub fn execute(args: &PlanArgs, lenient: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let resolver = super::load_resolver(&args.file, lenient)?;
    let plan = resolver.plan()?;

    output::header(out, &format!("Instantiation Plan for: {}", args.file.display()))?;
    output::indented(out, &plan.to_string())?;
    writeln!(out)?;
    writeln!(
        out,
        "  {}, {} unresolved.",
        output::counted(plan.steps.len(), "step"),
        plan.unresolved.len()
    )?;
    Ok(())
}
