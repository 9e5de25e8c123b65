mod backend;
mod cli;
mod commands;
mod config;
mod progress;
mod runner;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::CliConfig;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Name of the context under `<project>/contexts`
    pub context: String,
    pub project_dir: PathBuf,
    pub config: CliConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "bpctl", &mut io::stdout());
        return Ok(());
    }

    let config = CliConfig::load()?;
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        context: cli.context,
        project_dir: config.project_dir(cli.project_dir),
        config,
    };

    match cli.command {
        Command::Plan => commands::plan::run(&ctx),
        Command::Render(args) => commands::render::run(&ctx, &args),
        Command::Eval { expression } => commands::eval::run(&ctx, &expression),
        Command::Install(args) => commands::lifecycle::install(&ctx, &args),
        Command::Down(args) => commands::lifecycle::down(&ctx, &args),
        Command::Wait(args) => commands::lifecycle::wait(&ctx, &args),
        Command::Platforms => commands::platforms::run(&ctx),
        Command::Completions { .. } => Ok(()),
    }
}
