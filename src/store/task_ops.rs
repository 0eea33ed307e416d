use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TaskboardError;
use crate::models::{Category, Priority, Task, TaskDraft, TaskSource, TaskStatus};

use super::JsonStore;

/// Fields accepted when creating a task by hand.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub source: Option<TaskSource>,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub due_date: Option<String>,
}

/// Partial update. `None` leaves a field alone; `due_date: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.due_date.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub source: Option<TaskSource>,
    pub tag: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.category.map_or(true, |c| task.category == c)
            && self.source.as_ref().map_or(true, |s| &task.source == s)
            && self.tag.as_deref().map_or(true, |t| task.has_tag(t))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub affected: Vec<Task>,
    pub missing: Vec<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub completed_today: usize,
    pub completed_this_week: usize,
}

pub fn create_task(store: &JsonStore, new: NewTask) -> Result<Task, TaskboardError> {
    let title = validate_title(&new.title)?;
    let mut doc = store.load()?;

    let draft = TaskDraft {
        title,
        description: new.description.unwrap_or_default(),
        status: new.status.unwrap_or_default(),
        priority: new.priority.unwrap_or_default(),
        category: new.category.unwrap_or_default(),
        source: new.source.unwrap_or_default(),
        tags: dedup_tags(new.tags),
        metadata: new.metadata,
        due_date: new.due_date,
    };
    let task = Task::from_draft(draft, new_task_id(&doc.tasks), Utc::now());
    doc.tasks.push(task.clone());
    store.save(&mut doc)?;
    tracing::info!(id = %task.id, title = %task.title, "task created");
    Ok(task)
}

pub fn get_task(store: &JsonStore, id: &str) -> Result<Task, TaskboardError> {
    let doc = store.load()?;
    doc.find(id)
        .cloned()
        .ok_or_else(|| TaskboardError::task_not_found(id))
}

pub fn list_tasks(store: &JsonStore, filter: &TaskFilter) -> Result<Vec<Task>, TaskboardError> {
    let doc = store.load()?;
    Ok(doc.tasks.into_iter().filter(|t| filter.matches(t)).collect())
}

pub fn update_task(store: &JsonStore, id: &str, patch: TaskPatch) -> Result<Task, TaskboardError> {
    if patch.is_empty() {
        return Err(TaskboardError::validation("Nothing to update"));
    }
    if let Some(ref title) = patch.title {
        validate_title(title)?;
    }
    let mut doc = store.load()?;
    let task = doc
        .find_mut(id)
        .ok_or_else(|| TaskboardError::task_not_found(id))?;
    apply_patch(task, patch, Utc::now());
    let updated = task.clone();
    store.save(&mut doc)?;
    Ok(updated)
}

/// Remove the given ids. Unknown ids are reported, not fatal, unless none matched.
pub fn delete_tasks(store: &JsonStore, ids: &[String]) -> Result<BulkOutcome, TaskboardError> {
    let mut doc = store.load()?;
    let mut outcome = BulkOutcome::default();
    for id in ids {
        match doc.tasks.iter().position(|t| &t.id == id) {
            Some(idx) => outcome.affected.push(doc.tasks.remove(idx)),
            None => outcome.missing.push(id.clone()),
        }
    }
    if outcome.affected.is_empty() {
        return Err(TaskboardError::task_not_found(&outcome.missing.join(", ")));
    }
    store.save(&mut doc)?;
    Ok(outcome)
}

/// Apply one patch to many tasks in a single load/save cycle.
pub fn bulk_update(
    store: &JsonStore,
    ids: &[String],
    patch: TaskPatch,
) -> Result<BulkOutcome, TaskboardError> {
    if patch.is_empty() {
        return Err(TaskboardError::validation("Nothing to update"));
    }
    let mut doc = store.load()?;
    let now = Utc::now();
    let mut outcome = BulkOutcome::default();
    for id in ids {
        match doc.find_mut(id) {
            Some(task) => {
                apply_patch(task, patch.clone(), now);
                outcome.affected.push(task.clone());
            }
            None => outcome.missing.push(id.clone()),
        }
    }
    if outcome.affected.is_empty() {
        return Err(TaskboardError::task_not_found(&outcome.missing.join(", ")));
    }
    store.save(&mut doc)?;
    Ok(outcome)
}

pub fn search_tasks(store: &JsonStore, query: &str) -> Result<Vec<Task>, TaskboardError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(TaskboardError::validation("Search query is required"));
    }
    let doc = store.load()?;
    Ok(doc
        .tasks
        .into_iter()
        .filter(|t| matches_query(t, &needle))
        .collect())
}

pub fn task_stats(store: &JsonStore) -> Result<TaskStats, TaskboardError> {
    let doc = store.load()?;
    Ok(compute_stats(&doc.tasks, Utc::now()))
}

pub fn apply_patch(task: &mut Task, patch: TaskPatch, now: DateTime<Utc>) {
    if let Some(title) = patch.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if let Some(tags) = patch.tags {
        task.tags = dedup_tags(tags);
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(status) = patch.status {
        task.set_status(status, now);
    }
    task.normalize_completion(now);
    task.updated_at = now;
}

/// Case-insensitive substring match over the human-visible fields.
/// `needle` must already be lowercased.
pub fn matches_query(task: &Task, needle: &str) -> bool {
    let haystacks = [
        task.title.as_str(),
        task.description.as_str(),
        task.status.as_str(),
        task.priority.as_str(),
        task.category.as_str(),
        task.source.as_str(),
    ];
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(needle))
        || task.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

pub fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };
    for s in TaskStatus::ALL {
        stats.by_status.insert(s.as_str().to_string(), 0);
    }
    for p in Priority::ALL {
        stats.by_priority.insert(p.as_str().to_string(), 0);
    }
    for c in Category::ALL {
        stats.by_category.insert(c.as_str().to_string(), 0);
    }

    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or(now);
    let week_start = now - Duration::days(7);

    for t in tasks {
        *stats.by_status.entry(t.status.as_str().to_string()).or_default() += 1;
        *stats.by_priority.entry(t.priority.as_str().to_string()).or_default() += 1;
        *stats.by_category.entry(t.category.as_str().to_string()).or_default() += 1;
        if let Some(completed) = t.completed_at {
            if completed >= today_start {
                stats.completed_today += 1;
            }
            if completed >= week_start {
                stats.completed_this_week += 1;
            }
        }
    }
    stats
}

/// Fresh ULID, re-rolled in the (practically impossible) case it is taken.
pub fn new_task_id(tasks: &[Task]) -> String {
    loop {
        let id = ulid::Ulid::new().to_string();
        if !tasks.iter().any(|t| t.id == id) {
            return id;
        }
    }
}

fn validate_title(title: &str) -> Result<String, TaskboardError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskboardError::validation("Task title must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    fn fresh_store(dir: &TempDir) -> JsonStore {
        let store = JsonStore::new(dir.path().join("tasks.json"));
        store.init().unwrap();
        store
    }

    fn add(store: &JsonStore, title: &str) -> Task {
        create_task(
            store,
            NewTask {
                title: title.to_string(),
                ..NewTask::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let store = fresh_store(&dir);
        let task = add(&store, "  Renew passport ");
        assert_eq!(task.title, "Renew passport");
        assert_eq!(task.status, TaskStatus::Backlog);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Project);
        assert_eq!(task.source, TaskSource::Manual);
        assert!(task.completed_at.is_none());
        assert_eq!(get_task(&store, &task.id).unwrap(), task);
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let dir = TempDir::new().unwrap();
        let store = fresh_store(&dir);
        let err = create_task(&store, NewTask::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_update_maintains_completed_at() {
        let dir = TempDir::new().unwrap();
        let store = fresh_store(&dir);
        let task = add(&store, "Ship release");

        let done = update_task(
            &store,
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..TaskPatch::default()
            },
        )
        .unwrap();
        assert!(done.completed_at.is_some());

        let reopened = update_task(
            &store,
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Todo),
                ..TaskPatch::default()
            },
        )
        .unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = fresh_store(&dir);
        let err = update_task(
            &store,
            "nope",
            TaskPatch {
                title: Some("x".into()),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn test_delete_and_bulk_update_report_missing() {
        let dir = TempDir::new().unwrap();
        let store = fresh_store(&dir);
        let a = add(&store, "A");
        let b = add(&store, "B");

        let outcome = bulk_update(
            &store,
            &[a.id.clone(), "ghost".into()],
            TaskPatch {
                priority: Some(Priority::Urgent),
                ..TaskPatch::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.affected.len(), 1);
        assert_eq!(outcome.missing, vec!["ghost".to_string()]);
        assert_eq!(get_task(&store, &a.id).unwrap().priority, Priority::Urgent);

        let outcome = delete_tasks(&store, &[a.id.clone(), b.id.clone()]).unwrap();
        assert_eq!(outcome.affected.len(), 2);
        assert!(list_tasks(&store, &TaskFilter::default()).unwrap().is_empty());

        let err = delete_tasks(&store, &[a.id]).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn test_search_and_filter() {
        let dir = TempDir::new().unwrap();
        let store = fresh_store(&dir);
        create_task(
            &store,
            NewTask {
                title: "Call dentist".into(),
                tags: vec!["health".into(), "Health".into()],
                category: Some(Category::Communication),
                ..NewTask::default()
            },
        )
        .unwrap();
        add(&store, "Fix bike");

        let hits = search_tasks(&store, "HEALTH").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tags, vec!["health".to_string()]);

        let filter = TaskFilter {
            category: Some(Category::Communication),
            ..TaskFilter::default()
        };
        assert_eq!(list_tasks(&store, &filter).unwrap().len(), 1);

        assert_eq!(
            search_tasks(&store, "  ").unwrap_err().code,
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_compute_stats_windows() {
        let now = Utc::now();
        let mut recent = Task::from_draft(TaskDraft::new("a", TaskSource::Manual), "a".into(), now);
        recent.set_status(TaskStatus::Done, now);
        let mut old = Task::from_draft(TaskDraft::new("b", TaskSource::Manual), "b".into(), now);
        old.set_status(TaskStatus::Done, now - Duration::days(3));
        let open = Task::from_draft(TaskDraft::new("c", TaskSource::Cron), "c".into(), now);

        let stats = compute_stats(&[recent, old, open], now);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["done"], 2);
        assert_eq!(stats.by_status["backlog"], 1);
        assert_eq!(stats.by_status["in-progress"], 0);
        assert_eq!(stats.completed_today, 1);
        assert_eq!(stats.completed_this_week, 2);
    }
}
