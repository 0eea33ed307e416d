use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::TaskboardError;
use crate::models::{Task, TaskDocument};

/// Whole-file JSON task store. Every mutation is load → mutate → save; there
/// is no locking, so concurrent writers race and the last save wins.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the parent directory and an empty document if no store exists yet.
    /// Returns true if a new file was written.
    pub fn init(&self) -> Result<bool, TaskboardError> {
        if self.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskboardError::store_write(&self.path, e))?;
        }
        self.save(&mut TaskDocument::default())?;
        Ok(true)
    }

    /// Parse the whole document. Both the legacy bare array and the
    /// `{ "tasks": [...], "lastUpdated": ... }` shape are accepted.
    pub fn load(&self) -> Result<TaskDocument, TaskboardError> {
        if !self.exists() {
            return Err(TaskboardError::not_initialized(&self.path));
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| TaskboardError::store_read(&self.path, e))?;
        if raw.trim().is_empty() {
            return Ok(TaskDocument::default());
        }
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| TaskboardError::malformed_store(&self.path, e))?;
        self.parse_document(value)
    }

    fn parse_document(&self, value: Value) -> Result<TaskDocument, TaskboardError> {
        match value {
            Value::Array(_) => {
                let tasks: Vec<Task> = serde_json::from_value(value)
                    .map_err(|e| TaskboardError::malformed_store(&self.path, e))?;
                Ok(TaskDocument::new(upgrade_legacy(tasks)))
            }
            Value::Object(mut map) => {
                let tasks = match map.remove("tasks") {
                    Some(tasks @ Value::Array(_)) => serde_json::from_value::<Vec<Task>>(tasks)
                        .map_err(|e| TaskboardError::malformed_store(&self.path, e))?,
                    Some(Value::Null) | None => Vec::new(),
                    Some(_) => {
                        return Err(TaskboardError::malformed_store(
                            &self.path,
                            "`tasks` is not an array",
                        ))
                    }
                };
                let last_updated = map
                    .get("lastUpdated")
                    .and_then(Value::as_str)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|d| d.with_timezone(&Utc));
                Ok(TaskDocument {
                    tasks: upgrade_legacy(tasks),
                    last_updated,
                })
            }
            _ => Err(TaskboardError::malformed_store(
                &self.path,
                "expected an array of tasks or an object with a `tasks` array",
            )),
        }
    }

    /// Serialize the whole document, stamping `lastUpdated`. The bytes go to a
    /// sibling temp file that is renamed over the store, so a failed write
    /// leaves the previous file in place.
    pub fn save(&self, doc: &mut TaskDocument) -> Result<(), TaskboardError> {
        let previous = doc.last_updated;
        doc.last_updated = Some(Utc::now());
        let result = self.write_atomic(doc);
        if result.is_err() {
            doc.last_updated = previous;
        }
        result
    }

    fn write_atomic(&self, doc: &TaskDocument) -> Result<(), TaskboardError> {
        let body = serde_json::to_string_pretty(doc)
            .map_err(|e| TaskboardError::store_write(&self.path, e))?;
        let tmp = self.temp_path();

        let written = (|| -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(body.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(TaskboardError::store_write(&self.path, e));
        }
        tracing::debug!(path = %self.path.display(), tasks = doc.tasks.len(), "task store saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks.json".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }
}

fn upgrade_legacy(mut tasks: Vec<Task>) -> Vec<Task> {
    let upgraded = tasks.iter_mut().map(|t| t.adopt_legacy_cron_id()).filter(|upgraded| *upgraded).count();
    if upgraded > 0 {
        tracing::debug!(upgraded, "legacy cron records given cron identity");
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::{TaskDraft, TaskSource, TaskStatus};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonStore {
        JsonStore::new(dir.path().join("data").join("tasks.json"))
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.init().unwrap());
        assert!(!store.init().unwrap());
        let doc = store.load().unwrap();
        assert!(doc.tasks.is_empty());
        assert!(doc.last_updated.is_some());
    }

    #[test]
    fn test_load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let err = store_in(&dir).load().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotInitialized);
    }

    #[test]
    fn test_load_bare_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"[{"id":"task-001","title":"Gym","status":"done","createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z","completedAt":"2025-01-01T01:00:00Z"}]"#,
        )
        .unwrap();
        let doc = JsonStore::new(&path).load().unwrap();
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.tasks[0].status, TaskStatus::Done);
        assert!(doc.last_updated.is_none());
    }

    #[test]
    fn test_legacy_cron_records_match_on_sync() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"[{"id":"cron-3","title":"Isabgul - 00:00","status":"todo","cronJobId":"3","createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let doc = JsonStore::new(&path).load().unwrap();
        assert_eq!(doc.tasks[0].source, TaskSource::Cron);

        let candidate = TaskDraft {
            metadata: serde_json::json!({"cronId": "3"}).as_object().cloned().unwrap(),
            ..TaskDraft::new("Isabgul - 00:00", TaskSource::Cron)
        };
        let outcome = crate::sync::merge::merge(doc.tasks, vec![candidate]);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.tasks.len(), 1);
        assert_eq!(outcome.tasks[0].id, "cron-3");
    }

    #[test]
    fn test_load_wrapped_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"tasks":[{"id":"a","title":"A","createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"}],"lastUpdated":"2025-02-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        let doc = JsonStore::new(&path).load().unwrap();
        assert_eq!(doc.tasks[0].id, "a");
        assert_eq!(doc.last_updated.unwrap().to_rfc3339(), "2025-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_malformed_store_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonStore::new(&path).load().unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedStore);

        fs::write(&path, r#"{"tasks": 3}"#).unwrap();
        let err = JsonStore::new(&path).load().unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedStore);

        fs::write(&path, r#""hello""#).unwrap();
        let err = JsonStore::new(&path).load().unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedStore);
    }

    #[test]
    fn test_save_writes_wrapped_shape_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.init().unwrap();
        let mut doc = store.load().unwrap();
        doc.tasks.push(Task::from_draft(
            TaskDraft::new("Buy milk", TaskSource::Manual),
            "t1".into(),
            Utc::now(),
        ));
        store.save(&mut doc).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["tasks"][0]["title"], "Buy milk");
        assert!(raw["lastUpdated"].is_string());

        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_save_leaves_previous_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.init().unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(store.temp_path()).unwrap();
        let mut doc = TaskDocument::default();
        let err = store.save(&mut doc).unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreWriteFailed);
        assert!(doc.last_updated.is_none());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }
}
