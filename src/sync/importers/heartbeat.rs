use chrono::DateTime;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::models::{Category, Priority, TaskDraft, TaskSource, TaskStatus};
use crate::sync::source::{SourceClient, SourceError};

use super::Importer;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatState {
    #[serde(default)]
    pub last_checks: Map<String, Value>,
    #[serde(default)]
    pub pending_tasks: Vec<PendingTask>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingTask {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

pub struct HeartbeatImporter {
    client: Box<dyn SourceClient>,
}

impl HeartbeatImporter {
    pub fn new(client: Box<dyn SourceClient>) -> Self {
        Self { client }
    }
}

impl Importer for HeartbeatImporter {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    fn collect(&self) -> Result<Vec<TaskDraft>, SourceError> {
        let what = self.client.describe();
        let state: HeartbeatState =
            serde_json::from_value(self.client.fetch()?).map_err(|e| SourceError::Malformed {
                what,
                reason: e.to_string(),
            })?;
        Ok(state_to_drafts(&state))
    }
}

/// One in-progress record per recorded check, one todo per pending task.
pub fn state_to_drafts(state: &HeartbeatState) -> Vec<TaskDraft> {
    let mut drafts = Vec::new();

    for (check, stamp) in &state.last_checks {
        let Some(last_run) = check_time(stamp) else {
            continue;
        };
        let mut metadata = Map::new();
        metadata.insert("checkType".into(), json!(check));
        metadata.insert("lastRun".into(), stamp.clone());
        drafts.push(TaskDraft {
            description: format!("Automatic periodic check\nLast run: {last_run}"),
            status: TaskStatus::InProgress,
            priority: Priority::Low,
            category: Category::Automation,
            tags: vec!["heartbeat".into(), "monitoring".into(), "recurring".into()],
            metadata,
            ..TaskDraft::new(format!("Heartbeat Check: {check}"), TaskSource::Heartbeat)
        });
    }

    for pending in &state.pending_tasks {
        let title = pending
            .title
            .as_deref()
            .or(pending.description.as_deref())
            .map(str::trim)
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let mut tags = vec!["heartbeat".to_string()];
        for tag in &pending.tags {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.clone());
            }
        }
        drafts.push(TaskDraft {
            description: pending.description.clone().unwrap_or_default(),
            status: TaskStatus::Todo,
            priority: pending
                .priority
                .as_deref()
                .and_then(Priority::from_str)
                .unwrap_or_default(),
            category: pending
                .category
                .as_deref()
                .and_then(Category::from_str)
                .unwrap_or_default(),
            tags,
            metadata: pending.metadata.clone(),
            ..TaskDraft::new(title, TaskSource::Heartbeat)
        });
    }

    drafts
}

/// Unix seconds or an RFC 3339 string. Zero, null and false mean "never ran".
fn check_time(stamp: &Value) -> Option<String> {
    match stamp {
        Value::Number(n) => {
            let secs = n.as_i64().filter(|s| *s > 0)?;
            DateTime::from_timestamp(secs, 0).map(|d| d.to_rfc3339())
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
