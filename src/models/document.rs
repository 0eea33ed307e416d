use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Task;

/// The whole persisted store: every task plus the time of the last save.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub tasks: Vec<Task>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TaskDocument {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            last_updated: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}
