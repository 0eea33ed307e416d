use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TaskboardError;

const APP_NAME: &str = "taskboard";
pub const HOME_ENV: &str = "TASKBOARD_HOME";
pub const CONFIG_FILE: &str = "config.toml";

/// Everything the tool needs to know about where things live. Relative paths
/// are resolved against the home directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub sources: SourcesConfig,
    pub notifications: NotificationConfig,
    pub maintenance: MaintenanceConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tasks.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub command_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub cron: CronSourceConfig,
    pub heartbeat: HeartbeatSourceConfig,
    pub memory: MemorySourceConfig,
    pub project: ProjectSourceConfig,
    pub github: GithubSourceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronSourceConfig {
    pub enabled: bool,
    /// A JSON job list on disk. Takes precedence over `command`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub command: Vec<String>,
}

impl Default for CronSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
            command: ["openclaw", "cron", "list", "--json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatSourceConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for HeartbeatSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("memory/heartbeat-state.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySourceConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub max_age_days: u64,
}

impl Default for MemorySourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("memory"),
            max_age_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSourceConfig {
    pub enabled: bool,
    pub roots: Vec<PathBuf>,
    pub file_name: String,
    pub ignore: Vec<String>,
}

impl Default for ProjectSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            roots: vec![PathBuf::from("projects")],
            file_name: "TASK.md".to_string(),
            ignore: ["node_modules", "dist", ".git", "target"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSourceConfig {
    pub enabled: bool,
    /// `owner/repo`. When unset, the `origin` remote of `checkout` is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<PathBuf>,
    pub command: String,
    pub limit: u32,
}

impl Default for GithubSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo: None,
            checkout: None,
            command: "gh".to_string(),
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub queue: PathBuf,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue: PathBuf::from("task-notifications.queue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub daily_keywords: Vec<String>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            daily_keywords: ["daily", "gym", "medicine", "gre", "abs", "brush", "isabgul"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Extra classification rules, tried before the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub priority: Vec<RuleSpec>,
    pub category: Vec<RuleSpec>,
    pub cron_priority: Vec<RuleSpec>,
    pub cron_category: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub value: String,
}

impl Config {
    pub fn resolve(&self, home: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            home.join(path)
        }
    }

    pub fn store_path(&self, home: &Path) -> PathBuf {
        self.resolve(home, &self.store.path)
    }

    pub fn queue_path(&self, home: &Path) -> PathBuf {
        self.resolve(home, &self.notifications.queue)
    }
}

/// Home directory: explicit flag, then `TASKBOARD_HOME`, then the platform data dir.
pub fn resolve_home(flag: Option<&Path>) -> Result<PathBuf, TaskboardError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = env::var(HOME_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            TaskboardError::config(format!(
                "Could not determine a home directory. Set {HOME_ENV} or pass --home."
            ))
        })
}

pub fn config_file(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE)
}

/// Load `<home>/config.toml`, falling back to defaults when it does not exist.
pub fn load_config(home: &Path) -> Result<Config, TaskboardError> {
    let path = config_file(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(&path).map_err(|e| {
        TaskboardError::config(format!("Failed to read {}: {e}", path.display()))
    })?;
    toml::from_str(&contents).map_err(|e| {
        TaskboardError::config(format!("Failed to parse {}: {e}", path.display()))
    })
}

/// Write the default config unless one is already there. Returns true if written.
pub fn write_default_config(home: &Path) -> Result<bool, TaskboardError> {
    let path = config_file(home);
    if path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(home)?;
    let contents = toml::to_string_pretty(&Config::default())
        .map_err(|e| TaskboardError::config(e.to_string()))?;
    fs::write(&path, contents).map_err(|e| {
        TaskboardError::config(format!("Failed to write {}: {e}", path.display()))
    })?;
    Ok(true)
}
