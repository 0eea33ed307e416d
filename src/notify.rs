use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskboardError;
use crate::models::{Task, TaskStatus};

/// One line of the notification queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub timestamp: String,
    pub task_title: String,
    pub status: String,
    pub message: String,
}

impl Notification {
    pub fn new(task_title: &str, status: &str, at: DateTime<Utc>) -> Self {
        let message = match status {
            "in-progress" => format!("🚀 Task started: {task_title}"),
            "done" => format!("✅ Task completed: {task_title}"),
            "blocked" => format!("⚠️ Task blocked: {task_title}"),
            other => format!("📌 Task {other}: {task_title}"),
        };
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            task_title: task_title.to_string(),
            status: status.to_string(),
            message,
        }
    }
}

/// Append one JSON line to the queue, creating the file if needed.
pub fn enqueue(queue: &Path, notification: &Notification) -> Result<(), TaskboardError> {
    if let Some(parent) = queue.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let line = serde_json::to_string(notification)
        .map_err(|e| TaskboardError::io(format!("Failed to encode notification: {e}")))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(queue)
        .map_err(|e| TaskboardError::io(format!("Failed to open {}: {e}", queue.display())))?;
    writeln!(file, "{line}")
        .map_err(|e| TaskboardError::io(format!("Failed to write {}: {e}", queue.display())))?;
    tracing::debug!(queue = %queue.display(), message = %notification.message, "notification queued");
    Ok(())
}

/// Remembers the last seen status per task id and reports moves into
/// in-progress or done.
#[derive(Debug, Default)]
pub struct StatusTracker {
    seen: HashMap<String, TaskStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a snapshot without reporting anything.
    pub fn prime(&mut self, tasks: &[Task]) {
        for task in tasks {
            self.seen.insert(task.id.clone(), task.status);
        }
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    /// Compare a new snapshot with the last one. New ids are recorded silently;
    /// ids missing from the snapshot are forgotten.
    pub fn observe(&mut self, tasks: &[Task], at: DateTime<Utc>) -> Vec<Notification> {
        let current: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        self.seen.retain(|id, _| current.contains(id.as_str()));

        let mut out = Vec::new();
        for task in tasks {
            let previous = self.seen.insert(task.id.clone(), task.status);
            match previous {
                None => tracing::debug!(id = %task.id, title = %task.title, "new task seen"),
                Some(prev) if prev != task.status => {
                    tracing::info!(
                        title = %task.title,
                        from = prev.as_str(),
                        to = task.status.as_str(),
                        "status change"
                    );
                    if matches!(task.status, TaskStatus::InProgress | TaskStatus::Done) {
                        out.push(Notification::new(&task.title, task.status.as_str(), at));
                    }
                }
                Some(_) => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskDraft, TaskSource};
    use tempfile::TempDir;

    fn task(id: &str, title: &str, status: TaskStatus) -> Task {
        let draft = TaskDraft {
            status,
            ..TaskDraft::new(title, TaskSource::Manual)
        };
        Task::from_draft(draft, id.into(), Utc::now())
    }

    #[test]
    fn test_messages() {
        let at = Utc::now();
        assert_eq!(
            Notification::new("Ship it", "in-progress", at).message,
            "🚀 Task started: Ship it"
        );
        assert_eq!(Notification::new("Ship it", "done", at).message, "✅ Task completed: Ship it");
        assert_eq!(Notification::new("Ship it", "blocked", at).message, "⚠️ Task blocked: Ship it");
        assert_eq!(Notification::new("Ship it", "todo", at).message, "📌 Task todo: Ship it");
    }

    #[test]
    fn test_enqueue_appends_lines() {
        let dir = TempDir::new().unwrap();
        let queue = dir.path().join("nested/queue");
        let at = Utc::now();
        enqueue(&queue, &Notification::new("A", "done", at)).unwrap();
        enqueue(&queue, &Notification::new("B", "in-progress", at)).unwrap();

        let raw = fs::read_to_string(&queue).unwrap();
        let lines: Vec<Notification> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].task_title, "A");
        assert_eq!(lines[1].status, "in-progress");
        assert!(raw.contains("\"taskTitle\""));
    }

    #[test]
    fn test_tracker_reports_starts_and_completions() {
        let mut tracker = StatusTracker::new();
        tracker.prime(&[task("1", "Write", TaskStatus::Todo), task("2", "Read", TaskStatus::Todo)]);
        assert_eq!(tracker.tracked(), 2);

        let at = Utc::now();
        let out = tracker.observe(
            &[
                task("1", "Write", TaskStatus::InProgress),
                task("2", "Read", TaskStatus::Backlog),
                task("3", "New", TaskStatus::Done),
            ],
            at,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "🚀 Task started: Write");

        let out = tracker.observe(&[task("1", "Write", TaskStatus::Done)], at);
        assert_eq!(out[0].status, "done");
        assert!(tracker.observe(&[task("1", "Write", TaskStatus::Done)], at).is_empty());
    }

    #[test]
    fn test_tracker_forgets_deleted_tasks() {
        let mut tracker = StatusTracker::new();
        tracker.prime(&[task("1", "Keep", TaskStatus::Todo), task("2", "Drop", TaskStatus::Todo)]);
        let at = Utc::now();
        assert!(tracker.observe(&[task("1", "Keep", TaskStatus::Todo)], at).is_empty());
        assert_eq!(tracker.tracked(), 1);

        // A task that comes back is treated as new.
        assert!(tracker.observe(&[task("2", "Drop", TaskStatus::Done)], at).is_empty());
        assert_eq!(tracker.tracked(), 1);
    }
}
