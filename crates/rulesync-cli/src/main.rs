//! rulesync CLI
//!
//! Reconciles rule files across a set of sibling projects.

mod cli;
mod error;
mod interactive;
mod render;

use std::io::IsTerminal;

use clap::Parser;
use colored::Colorize;
use rulesync_core::{ConfigResolver, NoPrompt, Prompter, SyncEngine};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::{CliError, Result};
use interactive::TerminalPrompter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let resolver = match &cli.config_dir {
        Some(dir) => ConfigResolver::with_global_config_dir(dir),
        None => ConfigResolver::new(),
    };
    let options = resolver.resolve(cli.overrides())?;
    tracing::debug!(?options, "Resolved options");

    let interactive = options.interactive();
    let engine = SyncEngine::new(options);
    let mut terminal = TerminalPrompter::new();
    let mut no_prompt = NoPrompt;
    let prompter: &mut dyn Prompter = if interactive {
        &mut terminal
    } else {
        &mut no_prompt
    };

    if !cli.json {
        println!("{} Reconciling rule files...", "=>".blue().bold());
    }
    let report = engine.run(prompter)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }

    if !report.success {
        return Err(CliError::user("Synchronization failed"));
    }
    Ok(())
}
