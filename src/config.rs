use crate::model::UserId;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub user_id: Option<u64>,
    pub api_url: String,
    pub fixture: Option<PathBuf>,
    pub timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            fixture: None,
            timeout_secs: 10,
            log_file: None,
        }
    }
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub user_id: Option<u64>,
    pub api_url: Option<String>,
    pub fixture: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };
        let mut config = match path {
            Some(ref p) if p.exists() => read_config(p)?,
            Some(ref p) if explicit.is_some() => {
                anyhow::bail!("config file {:?} does not exist", p)
            }
            _ => Config::default(),
        };
        config.apply(overrides);
        Ok(config)
    }

    fn apply(&mut self, overrides: Overrides) {
        if let Some(id) = overrides.user_id {
            self.user_id = Some(id);
        }
        if let Some(url) = overrides.api_url {
            self.api_url = url;
        }
        if let Some(fixture) = overrides.fixture {
            self.fixture = Some(fixture);
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
    }

    /// `None` when unset or zero; the UI then shows the warning view.
    pub fn user(&self) -> Option<UserId> {
        self.user_id.and_then(UserId::new)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }
        let dirs = project_dirs().context("locating data directory")?;
        Ok(dirs.data_dir().join("todos.log"))
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if data.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&data).with_context(|| format!("parsing config {:?}", path))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "todos")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.yml"))
}
