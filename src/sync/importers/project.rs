use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};

use crate::models::{Category, TaskDraft, TaskSource, TaskStatus};
use crate::sync::rules::Classifier;
use crate::sync::source::SourceError;

use super::{parse_checkbox, Importer};

static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#+\s*(backlog|to[ -]?do|in[-\s]?progress|done)\b")
        .expect("valid section regex")
});

/// Walks project roots for per-project task files.
pub struct ProjectImporter {
    roots: Vec<PathBuf>,
    file_name: String,
    ignore: Vec<String>,
    classifier: Classifier,
}

impl ProjectImporter {
    pub fn new(
        roots: Vec<PathBuf>,
        file_name: impl Into<String>,
        ignore: Vec<String>,
        classifier: Classifier,
    ) -> Self {
        Self {
            roots,
            file_name: file_name.into(),
            ignore,
            classifier,
        }
    }

    fn task_files(&self, root: &Path) -> Vec<PathBuf> {
        let ignore = self.ignore.clone();
        let walker = ignore::WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                !ignore.iter().any(|skip| *skip == name)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "walk error");
                    continue;
                }
            };
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && entry.file_name().to_string_lossy() == self.file_name {
                files.push(entry.into_path());
            }
        }
        files
    }
}

impl Importer for ProjectImporter {
    fn name(&self) -> &'static str {
        "project"
    }

    fn collect(&self) -> Result<Vec<TaskDraft>, SourceError> {
        let existing: Vec<&PathBuf> = self.roots.iter().filter(|r| r.is_dir()).collect();
        if existing.is_empty() {
            return Err(SourceError::Unavailable {
                what: "project roots".into(),
                reason: "no configured root is a directory".into(),
            });
        }

        let mut drafts = Vec::new();
        for root in existing {
            for path in self.task_files(root) {
                let content = match fs::read_to_string(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "skipping unreadable task file");
                        continue;
                    }
                };
                let rel = path.strip_prefix(root).unwrap_or(&path);
                let file = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let project = path
                    .parent()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "project".to_string());
                drafts.extend(scan_task_file(&project, &file, &content, &self.classifier));
            }
        }
        Ok(drafts)
    }
}

/// Checkbox items in a task file. A header starting with a status word sets
/// the status of the unchecked items under it; other headers leave it alone.
pub fn scan_task_file(
    project: &str,
    file: &str,
    content: &str,
    classifier: &Classifier,
) -> Vec<TaskDraft> {
    let mut section = TaskStatus::Backlog;
    let mut drafts = Vec::new();

    for line in content.lines() {
        if let Some(status) = section_status(line) {
            section = status;
            continue;
        }
        let Some((checked, text)) = parse_checkbox(line) else {
            continue;
        };

        let mut metadata = Map::new();
        metadata.insert("project".into(), json!(project));
        metadata.insert("file".into(), json!(file));

        drafts.push(TaskDraft {
            description: format!("From {project}/{}", file.rsplit('/').next().unwrap_or(file)),
            status: if checked { TaskStatus::Done } else { section },
            priority: classifier.priority.classify(text),
            category: Category::Project,
            tags: vec!["project".into(), project.to_string()],
            metadata,
            ..TaskDraft::new(format!("[{project}] {text}"), TaskSource::Project)
        });
    }

    drafts
}

fn section_status(line: &str) -> Option<TaskStatus> {
    let word = SECTION_RE.captures(line)?.get(1)?.as_str().to_lowercase();
    match word.as_str() {
        "backlog" => Some(TaskStatus::Backlog),
        "done" => Some(TaskStatus::Done),
        w if w.starts_with("to") => Some(TaskStatus::Todo),
        _ => Some(TaskStatus::InProgress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn classifier() -> Classifier {
        Classifier::builtin().unwrap()
    }

    #[test]
    fn test_sections_set_status() {
        let content = "\
# Website

## In Progress
- [ ] migrate blog
- [x] buy domain

## Backlog
- [ ] dark mode

## Todo
- [ ] fix footer bug

## Notes
- [ ] email the designer
plain line
";
        let drafts = scan_task_file("website", "website/TASK.md", content, &classifier());
        let got: Vec<(&str, TaskStatus)> =
            drafts.iter().map(|d| (d.title.as_str(), d.status)).collect();
        assert_eq!(
            got,
            vec![
                ("[website] migrate blog", TaskStatus::InProgress),
                ("[website] buy domain", TaskStatus::Done),
                ("[website] dark mode", TaskStatus::Backlog),
                ("[website] fix footer bug", TaskStatus::Todo),
                ("[website] email the designer", TaskStatus::Todo),
            ]
        );
        assert!(drafts.iter().all(|d| d.category == Category::Project));
        assert_eq!(drafts[0].source, TaskSource::Project);
        assert_eq!(drafts[0].metadata["file"], "website/TASK.md");
        assert_eq!(drafts[0].tags, vec!["project".to_string(), "website".to_string()]);
    }

    #[test]
    fn test_sub_headers_keep_section() {
        let content = "\
## Done
### Frontend
- [ ] polish navbar
## In Progress (week 3)
- [ ] wire api
#Todo
- [ ] tidy
## In-progress
- [ ] deploy
";
        let drafts = scan_task_file("web", "web/TASK.md", content, &classifier());
        let got: Vec<TaskStatus> = drafts.iter().map(|d| d.status).collect();
        assert_eq!(
            got,
            vec![
                TaskStatus::Done,
                TaskStatus::InProgress,
                TaskStatus::Todo,
                TaskStatus::InProgress,
            ]
        );
    }

    #[test]
    fn test_walk_skips_ignored_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("projects");
        fs::create_dir_all(root.join("alpha")).unwrap();
        fs::create_dir_all(root.join("beta/node_modules/dep")).unwrap();
        fs::write(root.join("alpha/TASK.md"), "- [ ] ship alpha").unwrap();
        fs::write(root.join("beta/TASK.md"), "## Done\n- [ ] ship beta").unwrap();
        fs::write(root.join("beta/node_modules/dep/TASK.md"), "- [ ] vendored").unwrap();

        let importer = ProjectImporter::new(
            vec![root.clone(), dir.path().join("missing")],
            "TASK.md",
            vec!["node_modules".into()],
            classifier(),
        );
        let drafts = importer.collect().unwrap();
        let titles: Vec<&str> = drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["[alpha] ship alpha", "[beta] ship beta"]);
        assert_eq!(drafts[0].status, TaskStatus::Backlog);
        assert_eq!(drafts[1].status, TaskStatus::Done);
        assert_eq!(drafts[1].metadata["file"], "beta/TASK.md");
    }

    #[test]
    fn test_no_roots_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let importer =
            ProjectImporter::new(vec![dir.path().join("nope")], "TASK.md", vec![], classifier());
        assert!(importer.collect().is_err());
    }
}
