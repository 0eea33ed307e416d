use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{Task, TaskDraft, TaskSource, TaskStatus};
use crate::store::task_ops::new_task_id;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub tasks: Vec<Task>,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.updated > 0
    }
}

/// Key used to match an imported candidate against stored tasks across syncs.
///
/// Sources with a stable external id (cron job id, issue number) key on that
/// id; project items are scoped by file; everything else falls back to the
/// lowercased, trimmed title.
pub fn identity_key(source: &TaskSource, metadata: &Map<String, Value>, title: &str) -> String {
    let title = title.trim().to_lowercase();
    match source {
        TaskSource::Cron => {
            if let Some(id) = metadata.get("cronId").and_then(scalar_to_string) {
                return format!("cron:{id}");
            }
        }
        TaskSource::Github => {
            if let Some(number) = metadata.get("githubIssueNumber").and_then(scalar_to_string) {
                return match metadata.get("githubRepo").and_then(Value::as_str) {
                    Some(repo) => format!("github:{}#{number}", repo.to_lowercase()),
                    None => format!("github:#{number}"),
                };
            }
        }
        TaskSource::Project => {
            if let Some(file) = metadata.get("file").and_then(Value::as_str) {
                return format!("project:{file}:{title}");
            }
        }
        _ => {}
    }
    format!("{}:{title}", source.as_str())
}

pub fn task_key(task: &Task) -> String {
    identity_key(&task.source, &task.metadata, &task.title)
}

pub fn draft_key(draft: &TaskDraft) -> String {
    identity_key(&draft.source, &draft.metadata, &draft.title)
}

pub fn merge(existing: Vec<Task>, candidates: Vec<TaskDraft>) -> MergeOutcome {
    merge_at(existing, candidates, Utc::now())
}

/// Fold imported candidates into the stored list.
///
/// New keys are appended with a fresh id. A matching record is only touched
/// when it came from the same source and is not done, and only its status
/// (with updatedAt/completedAt) changes. Manual tasks never enter the key
/// index, so a sync can neither absorb nor rewrite them. Stored records with
/// no candidate are left alone; nothing is ever removed.
pub fn merge_at(existing: Vec<Task>, candidates: Vec<TaskDraft>, now: DateTime<Utc>) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        tasks: existing,
        ..MergeOutcome::default()
    };

    let mut index: HashMap<String, usize> = HashMap::new();
    for (pos, task) in outcome.tasks.iter().enumerate() {
        if task.source == TaskSource::Manual {
            continue;
        }
        index.entry(task_key(task)).or_insert(pos);
    }

    let mut seen: HashSet<String> = HashSet::new();

    for candidate in candidates {
        if candidate.source == TaskSource::Manual {
            tracing::warn!(title = %candidate.title, "ignoring sync candidate with manual source");
            continue;
        }
        let key = draft_key(&candidate);
        if !seen.insert(key.clone()) {
            tracing::debug!(%key, "duplicate candidate in batch, keeping the first");
            continue;
        }

        match index.get(&key) {
            None => {
                let id = new_task_id(&outcome.tasks);
                tracing::debug!(%key, %id, "adding synced task");
                index.insert(key, outcome.tasks.len());
                outcome.tasks.push(Task::from_draft(candidate, id, now));
                outcome.added += 1;
            }
            Some(&pos) => {
                let task = &mut outcome.tasks[pos];
                let eligible = task.source == candidate.source && task.status != TaskStatus::Done;
                if eligible && task.set_status(candidate.status, now) {
                    tracing::debug!(%key, id = %task.id, status = task.status.as_str(), "synced status change");
                    outcome.updated += 1;
                } else {
                    outcome.unchanged += 1;
                }
            }
        }
    }

    outcome
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
