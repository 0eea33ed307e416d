use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};

use crate::models::{TaskDraft, TaskSource, TaskStatus};
use crate::sync::rules::Classifier;
use crate::sync::source::SourceError;

use super::{parse_checkbox, Importer};

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\s\-*]*(?:TODO|TASK|Action Item)\b:?\s*(.+)$").expect("valid marker regex")
});

static DONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[x\]|\[✓\]|✓|✅|\bDONE\b|\bCOMPLETED\b").expect("valid done regex")
});

/// Scans recent notes in a directory for TODO markers and checkboxes.
pub struct MemoryImporter {
    dir: PathBuf,
    max_age: Duration,
    classifier: Classifier,
}

impl MemoryImporter {
    pub fn new(dir: impl Into<PathBuf>, max_age_days: u64, classifier: Classifier) -> Self {
        Self {
            dir: dir.into(),
            max_age: Duration::from_secs(max_age_days * 24 * 60 * 60),
            classifier,
        }
    }

    fn recent_notes(&self) -> Result<Vec<PathBuf>, SourceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SourceError::Unavailable {
            what: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let now = SystemTime::now();

        let mut notes: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("md") | Some("txt")
                )
            })
            .filter(|path| {
                let Ok(meta) = fs::metadata(path) else {
                    return false;
                };
                if !meta.is_file() {
                    return false;
                }
                meta.modified()
                    .ok()
                    .and_then(|m| now.duration_since(m).ok())
                    .map(|age| age <= self.max_age)
                    // Timestamps in the future count as fresh.
                    .unwrap_or(true)
            })
            .collect();
        notes.sort();
        Ok(notes)
    }
}

impl Importer for MemoryImporter {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn collect(&self) -> Result<Vec<TaskDraft>, SourceError> {
        let mut drafts = Vec::new();
        for path in self.recent_notes()? {
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping unreadable note");
                    continue;
                }
            };
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            drafts.extend(scan_note(&file, &content, &self.classifier));
        }
        Ok(drafts)
    }
}

/// Candidates from one note. Marker lines win over checkbox parsing.
pub fn scan_note(file: &str, content: &str, classifier: &Classifier) -> Vec<TaskDraft> {
    let mut drafts = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let (title, done, kind) = if let Some(caps) = MARKER_RE.captures(line) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let done = DONE_RE.is_match(raw);
            let cleaned = DONE_RE.replace_all(raw, "");
            let title = clean_title(&cleaned);
            (title, done, "todo")
        } else if let Some((checked, text)) = parse_checkbox(line) {
            (clean_title(text), checked, "checkbox")
        } else {
            continue;
        };

        if title.is_empty() {
            continue;
        }

        let mut metadata = Map::new();
        metadata.insert("file".into(), json!(file));
        metadata.insert("line".into(), json!(idx + 1));

        drafts.push(TaskDraft {
            description: format!("From {file}"),
            status: if done {
                TaskStatus::Done
            } else {
                TaskStatus::Todo
            },
            priority: classifier.priority.classify(&title),
            category: classifier.category.classify(&title),
            tags: vec!["memory".into(), kind.into()],
            metadata,
            ..TaskDraft::new(title, TaskSource::Memory)
        });
    }

    drafts
}

fn clean_title(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == ':')
        .to_string()
}
