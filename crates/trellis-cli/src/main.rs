//! # trellis: Trellis CLI
//!
//! Inspects scope manifests without instantiating them.
//! Prints instantiation plans and binding hierarchies, and validates scopes.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    commands::execute(cli, &mut stdout.lock())
}
