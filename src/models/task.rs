use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Backlog,
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [Self::Backlog, Self::Todo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }

    /// Accepts the stored spelling plus the loose variants found in markdown
    /// headers ("In Progress", "in_progress").
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "backlog" => Some(Self::Backlog),
            "todo" => Some(Self::Todo),
            "in-progress" | "inprogress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Automation,
    #[default]
    Project,
    Communication,
    Maintenance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::Automation,
        Self::Project,
        Self::Communication,
        Self::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automation => "automation",
            Self::Project => "project",
            Self::Communication => "communication",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "automation" => Some(Self::Automation),
            "project" => Some(Self::Project),
            "communication" => Some(Self::Communication),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

/// Where a task came from. Free text on disk; the known origins get variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskSource {
    #[default]
    Manual,
    Cron,
    Heartbeat,
    Memory,
    Project,
    Github,
    Other(String),
}

impl TaskSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Cron => "cron",
            Self::Heartbeat => "heartbeat",
            Self::Memory => "memory",
            Self::Project => "project",
            Self::Github => "github",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TaskSource {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "manual" => Self::Manual,
            "cron" => Self::Cron,
            "heartbeat" => Self::Heartbeat,
            "memory" => Self::Memory,
            "project" => Self::Project,
            "github" => Self::Github,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for TaskSource {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TaskSource> for String {
    fn from(s: TaskSource) -> Self {
        s.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: TaskSource,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<String>,
    /// Fields written by older tools that this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn from_draft(draft: TaskDraft, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            category: draft.category,
            source: draft.source,
            tags: draft.tags,
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
            completed_at: (draft.status == TaskStatus::Done).then_some(now),
            due_date: draft.due_date,
            extra: Map::new(),
        }
    }

    /// Moves the task to `status`, keeping `completed_at` set exactly while done.
    /// Returns false when the status was already `status`.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        self.completed_at = match status {
            TaskStatus::Done => Some(now),
            _ => None,
        };
        true
    }

    /// Re-establishes the completion invariant after an arbitrary field edit.
    pub fn normalize_completion(&mut self, now: DateTime<Utc>) {
        match (self.status, self.completed_at) {
            (TaskStatus::Done, None) => self.completed_at = Some(now),
            (TaskStatus::Done, Some(_)) => {}
            (_, _) => self.completed_at = None,
        }
    }

    /// Records written by the old cron scripts have a top-level `cronJobId`
    /// and no source. Give them cron identity so a sync matches them instead
    /// of appending copies. Returns true when the record was upgraded.
    pub fn adopt_legacy_cron_id(&mut self) -> bool {
        if self.source != TaskSource::Manual {
            return false;
        }
        let Some(id) = self
            .extra
            .get("cronJobId")
            .filter(|v| v.is_string() || v.is_number())
            .cloned()
        else {
            return false;
        };
        self.source = TaskSource::Cron;
        self.metadata.entry("cronId").or_insert(id);
        true
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// A task-shaped record produced by an importer, not yet given a store identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: Category,
    pub source: TaskSource,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub due_date: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, source: TaskSource) -> Self {
        Self {
            title: title.into(),
            source,
            ..Self::default()
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
