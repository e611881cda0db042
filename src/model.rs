use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

/// Owner of the task list. Zero is not a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(NonZeroU64);

impl UserId {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(UserId)
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterMode {
    pub const MODES: [FilterMode; 3] = [
        FilterMode::All,
        FilterMode::Active,
        FilterMode::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Active => "Active",
            FilterMode::Completed => "Completed",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FilterMode::All => FilterMode::Active,
            FilterMode::Active => FilterMode::Completed,
            FilterMode::Completed => FilterMode::All,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FilterMode::All => FilterMode::Completed,
            FilterMode::Active => FilterMode::All,
            FilterMode::Completed => FilterMode::Active,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Active => !task.completed,
            FilterMode::Completed => task.completed,
        }
    }
}

/// Stable filter over `tasks`; relative order is never changed.
pub fn filtered_tasks(tasks: &[Task], mode: FilterMode) -> Vec<&Task> {
    tasks.iter().filter(|t| mode.matches(t)).collect()
}

/// True when every task is completed, including the empty list.
pub fn all_completed(tasks: &[Task]) -> bool {
    tasks.iter().all(|t| t.completed)
}

pub fn active_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|t| !t.completed).count()
}

#[cfg(test)]
pub(crate) fn task(id: u64, title: &str, completed: bool) -> Task {
    Task {
        id,
        user_id: 1,
        title: title.to_string(),
        completed,
    }
}
