//! abuild CLI - cross-compile autotools libraries for Android

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use abuild::builder::BuildError;
use abuild::util::Shell;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("abuild=debug")
    } else {
        EnvFilter::new("abuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    if let Err(e) = run(cli.command, &shell) {
        report_error(&shell, &e);
        std::process::exit(1);
    }
}

fn run(command: Commands, shell: &Shell) -> Result<()> {
    match command {
        Commands::Build(args) => commands::build::execute(args, shell),
        Commands::Abis => commands::abis::execute(),
    }
}

/// Concise message by default; the context chain and captured tool output
/// in verbose mode.
fn report_error(shell: &Shell, e: &anyhow::Error) {
    if !shell.is_verbose() {
        shell.error(e);
        return;
    }

    shell.error(format!("{:#}", e));
    if let Some(detail) = e.downcast_ref::<BuildError>().and_then(|b| b.detail()) {
        eprintln!("{}", detail);
    }
}
