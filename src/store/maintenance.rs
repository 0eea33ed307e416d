//! Housekeeping passes over the whole store. Each is one load/save cycle and
//! saves only when something changed.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::TaskboardError;
use crate::models::{Task, TaskSource, TaskStatus};
use crate::sync::merge::task_key;

use super::JsonStore;

pub const DAILY_TAG: &str = "daily";

/// Put completed daily tasks back to todo for a new day.
pub fn reset_daily(store: &JsonStore) -> Result<Vec<Task>, TaskboardError> {
    let mut doc = store.load()?;
    let reset = reset_daily_in(&mut doc.tasks, Utc::now());
    if !reset.is_empty() {
        store.save(&mut doc)?;
        tracing::info!(count = reset.len(), "daily tasks reset");
    }
    Ok(reset)
}

/// Tag tasks whose title or description mentions one of `keywords` as daily.
pub fn tag_daily(store: &JsonStore, keywords: &[String]) -> Result<Vec<Task>, TaskboardError> {
    let mut doc = store.load()?;
    let tagged = tag_daily_in(&mut doc.tasks, keywords, Utc::now());
    if !tagged.is_empty() {
        store.save(&mut doc)?;
        tracing::info!(count = tagged.len(), "daily tags added");
    }
    Ok(tagged)
}

/// Drop imported records that share an identity key with an earlier one.
/// Manual tasks are never considered duplicates.
pub fn dedupe(store: &JsonStore) -> Result<Vec<Task>, TaskboardError> {
    let mut doc = store.load()?;
    let removed = dedupe_in(&mut doc.tasks);
    if !removed.is_empty() {
        store.save(&mut doc)?;
        tracing::info!(count = removed.len(), "duplicate tasks removed");
    }
    Ok(removed)
}

pub fn reset_daily_in(tasks: &mut [Task], now: DateTime<Utc>) -> Vec<Task> {
    tasks
        .iter_mut()
        .filter(|t| t.status == TaskStatus::Done && t.has_tag(DAILY_TAG))
        .filter_map(|t| t.set_status(TaskStatus::Todo, now).then(|| t.clone()))
        .collect()
}

pub fn tag_daily_in(tasks: &mut [Task], keywords: &[String], now: DateTime<Utc>) -> Vec<Task> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let mut tagged = Vec::new();
    for task in tasks.iter_mut() {
        if task.has_tag(DAILY_TAG)
            || !(mentions_any(&task.title, &keywords) || mentions_any(&task.description, &keywords))
        {
            continue;
        }
        task.tags.push(DAILY_TAG.to_string());
        task.updated_at = now;
        tagged.push(task.clone());
    }
    tagged
}

pub fn dedupe_in(tasks: &mut Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let mut removed = Vec::new();
    tasks.retain(|task| {
        if task.source == TaskSource::Manual || seen.insert(task_key(task)) {
            return true;
        }
        removed.push(task.clone());
        false
    });
    removed
}

fn mentions_any(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| keywords.iter().any(|k| k == word))
}
