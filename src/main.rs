mod app;
mod cli;
mod commands;
mod config;
mod logging;
mod model;
mod notifier;
mod source;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::Config::load(args.config.as_deref(), args.overrides())?;
    match args.command.unwrap_or(cli::Command::Tui) {
        cli::Command::List { filter } => {
            logging::init_stderr()?;
            commands::list(&config, filter)
        }
        cli::Command::Tui => {
            logging::init_file(&config.log_path()?)?;
            commands::tui(&config)
        }
    }
}
