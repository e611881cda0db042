use crate::config::Overrides;
use crate::model::FilterMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "todos", version, about = "Terminal view of a user's todo list")]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// User whose tasks are shown
    #[arg(long, global = true)]
    pub user_id: Option<u64>,
    /// Base URL of the todos API
    #[arg(long, global = true)]
    pub api_url: Option<String>,
    /// Read tasks from a local JSON/YAML file instead of the API
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,
    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the task list once and exit
    List {
        /// Which tasks to show
        #[arg(long, value_enum, default_value_t = FilterMode::All)]
        filter: FilterMode,
    },
    /// Launch the interactive TUI
    Tui,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            user_id: self.user_id,
            api_url: self.api_url.clone(),
            fixture: self.fixture.clone(),
            timeout_secs: self.timeout,
        }
    }
}
