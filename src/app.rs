use crate::model::{self, FilterMode, Task, UserId};
use crate::notifier::{ErrorKind, Notifier};
use crate::source::{spawn_load, PendingLoad, TaskSource};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct App {
    tasks: Vec<Task>,
    filter: FilterMode,
    notifier: Notifier,
    source: Arc<dyn TaskSource>,
    user: UserId,
    pending: Option<PendingLoad>,
    loaded_at: Option<DateTime<Local>>,
    status: String,
}

impl App {
    pub fn new(source: Arc<dyn TaskSource>, user: UserId) -> Self {
        let status = format!("Tasks for user {} from {}", user, source.describe());
        App {
            tasks: Vec::new(),
            filter: FilterMode::default(),
            notifier: Notifier::new(),
            source,
            user,
            pending: None,
            loaded_at: None,
            status,
        }
    }

    /// Kicks off a background fetch unless one is already in flight.
    pub fn start_load(&mut self) -> bool {
        if self.pending.is_some() {
            debug!("load already in flight; ignoring request");
            return false;
        }
        self.pending = Some(spawn_load(self.source.clone(), self.user));
        self.status = "Loading tasks...".into();
        true
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies a finished load, if any. Returns true when state changed.
    pub fn poll_load(&mut self, now: Instant) -> bool {
        let result = match self.pending.as_ref().and_then(|p| p.poll()) {
            Some(result) => result,
            None => return false,
        };
        self.pending = None;
        match result {
            Ok(tasks) => {
                info!(count = tasks.len(), "task store replaced");
                self.status = format!("Loaded {} tasks", tasks.len());
                self.tasks = tasks;
                self.loaded_at = Some(Local::now());
            }
            Err(err) => {
                warn!(error = %err, "showing load failure");
                self.status = "Load failed".into();
                self.notifier.notify(ErrorKind::LoadFailure, now);
            }
        }
        true
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        let loaded = self.poll_load(now);
        let expired = self.notifier.fire_due(now);
        loaded || expired
    }

    pub fn set_filter(&mut self, mode: FilterMode) {
        if self.filter != mode {
            debug!(filter = mode.label(), "filter changed");
        }
        self.filter = mode;
    }

    pub fn dismiss_error(&mut self) {
        self.notifier.dismiss();
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.set_filter(FilterMode::All),
            KeyCode::Char('2') => self.set_filter(FilterMode::Active),
            KeyCode::Char('3') => self.set_filter(FilterMode::Completed),
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                self.set_filter(self.filter.next())
            }
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.set_filter(self.filter.prev())
            }
            KeyCode::Char('x') | KeyCode::Esc => self.dismiss_error(),
            KeyCode::Char('r') => {
                if !self.start_load() {
                    self.status = "Already loading".into();
                }
            }
            _ => {}
        }
        false
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn filtered_tasks(&self) -> Vec<&Task> {
        model::filtered_tasks(&self.tasks, self.filter)
    }

    pub fn all_completed(&self) -> bool {
        model::all_completed(&self.tasks)
    }

    pub fn footer_visible(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.notifier.message()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn loaded_at(&self) -> Option<DateTime<Local>> {
        self.loaded_at
    }

    #[cfg(test)]
    pub(crate) fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Polls until the in-flight load lands; returns the instant it was applied at.
    pub fn settle(app: &mut App) -> Instant {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let now = Instant::now();
            if app.poll_load(now) {
                return now;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("load did not settle");
    }
}
