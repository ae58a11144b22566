//! CLI command definitions and dispatch.

pub mod check;
pub mod hierarchy;
pub mod plan;

use std::io::Write;
use std::path::Path;

use clap::{Parser, Subcommand};
use trellis_sdk::graph_resolver::GraphResolver;
use trellis_sdk::manifest::Manifest;

/// Trellis: binding and dependency-resolution inspector.
#[derive(Parser, Debug)]
#[command(name = trellis_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Skip unresolved requirements instead of failing.
    #[arg(long, global = true, env = "TRELLIS_LENIENT")]
    pub lenient: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display the instantiation plan of a manifest.
    Plan(plan::PlanArgs),
    /// Display binding hierarchies.
    Hierarchy(hierarchy::HierarchyArgs),
    /// Validate a manifest; exits non-zero on fatal cycles or missing bindings.
    Check(check::CheckArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => plan::execute(&args, cli.lenient, out),
        Command::Hierarchy(args) => hierarchy::execute(&args, cli.lenient, out),
        Command::Check(args) => check::execute(&args, cli.lenient, out),
    }
}

/// Loads `path` and configures a resolver, relaxing strictness when asked.
pub(crate) fn load_resolver(path: &Path, lenient: bool) -> anyhow::Result<GraphResolver> {
    let mut manifest = Manifest::load(path)?;
    if lenient {
        manifest.settings.strict = false;
    }
    tracing::debug!(
        path = %path.display(),
        strict = manifest.settings.strict,
        "manifest loaded"
    );
    Ok(GraphResolver::from_manifest(&manifest)?)
}
