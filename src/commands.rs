use crate::app::App;
use crate::config::Config;
use crate::model::{self, FilterMode, Task};
use crate::source::{spawn_load, FixtureSource, HttpSource, TaskSource};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};

pub fn tui(config: &Config) -> Result<()> {
    let user = match config.user() {
        Some(user) => user,
        None => {
            warn!("no user id configured; showing warning view");
            return ui::run_warning();
        }
    };
    let source = build_source(config)?;
    info!(user = %user, "starting tui");
    ui::run(App::new(source, user))
}

pub fn list(config: &Config, filter: FilterMode) -> Result<()> {
    let user = config
        .user()
        .ok_or_else(|| anyhow!("no user id configured; set user_id in config.yml or pass --user-id"))?;
    let source = build_source(config)?;
    let tasks = spawn_load(source, user)
        .wait()
        .with_context(|| format!("loading tasks for user {}", user))?;
    let stdout = io::stdout();
    print_tasks(&mut stdout.lock(), &tasks, filter)?;
    Ok(())
}

pub fn build_source(config: &Config) -> Result<Arc<dyn TaskSource>> {
    if let Some(path) = &config.fixture {
        return Ok(Arc::new(FixtureSource::new(path)));
    }
    let http = HttpSource::new(&config.api_url, config.timeout())
        .context("building http client")?;
    Ok(Arc::new(http))
}

fn print_tasks(out: &mut impl Write, tasks: &[Task], filter: FilterMode) -> io::Result<()> {
    let shown = model::filtered_tasks(tasks, filter);
    writeln!(out, "{} ({})", filter.label(), shown.len())?;
    if shown.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for task in shown {
        let mark = if task.completed { "x" } else { " " };
        writeln!(out, "  [{}] {}: {}", mark, task.id, task.title)?;
    }
    writeln!(
        out,
        "{} total, {} left",
        tasks.len(),
        model::active_count(tasks)
    )?;
    Ok(())
}
