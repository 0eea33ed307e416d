use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map};

use crate::models::{Category, Priority, TaskDraft, TaskSource, TaskStatus};
use crate::sync::rules::RuleTable;
use crate::sync::source::{CommandClient, SourceClient, SourceError};

use super::Importer;

const DESCRIPTION_LIMIT: usize = 500;

static REMOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").expect("valid remote regex")
});

static DUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)due(?:\s+date)?:?\s*(\d{4}-\d{2}-\d{2})").expect("valid due regex")
});

// Label tables match against the newline-joined, lowercased label names.
static STATUS_LABELS: Lazy<RuleTable<TaskStatus>> = Lazy::new(|| {
    RuleTable::new(TaskStatus::Backlog)
        .rule(r"(?m)^(in[ -]progress|wip)$", TaskStatus::InProgress)
        .and_then(|t| t.rule(r"(?m)^(todo|to do|ready)$", TaskStatus::Todo))
        .expect("valid status label rules")
});

static PRIORITY_LABELS: Lazy<RuleTable<Priority>> = Lazy::new(|| {
    RuleTable::new(Priority::Medium)
        .rule(r"critical|urgent|p0", Priority::Urgent)
        .and_then(|t| t.rule(r"high|p1", Priority::High))
        .and_then(|t| t.rule(r"low|p3", Priority::Low))
        .expect("valid priority label rules")
});

static CATEGORY_LABELS: Lazy<RuleTable<Category>> = Lazy::new(|| {
    RuleTable::new(Category::Project)
        .rule(r"bug|fix", Category::Maintenance)
        .and_then(|t| t.rule(r"automation|\bci\b", Category::Automation))
        .and_then(|t| t.rule(r"communication|notification", Category::Communication))
        .expect("valid category label rules")
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignee {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Milestone {
    #[serde(default)]
    pub title: String,
}

/// Lists issues through the `gh` CLI.
pub struct GithubImporter {
    repo: Option<String>,
    checkout: PathBuf,
    program: String,
    limit: u32,
    timeout: Duration,
}

impl GithubImporter {
    pub fn new(
        repo: Option<String>,
        checkout: impl Into<PathBuf>,
        program: impl Into<String>,
        limit: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            checkout: checkout.into(),
            program: program.into(),
            limit,
            timeout,
        }
    }

    /// Configured repo, else the `origin` remote of the checkout.
    fn resolve_repo(&self) -> Option<String> {
        if let Some(ref repo) = self.repo {
            return Some(repo.clone());
        }
        let git = CommandClient::new(
            "git",
            vec!["remote".into(), "get-url".into(), "origin".into()],
            self.timeout,
        )
        .current_dir(&self.checkout);
        match git.run_text() {
            Ok(url) => parse_remote(&url),
            Err(e) => {
                tracing::debug!(error = %e, "no git origin");
                None
            }
        }
    }

    fn issue_client(&self, repo: &str) -> CommandClient {
        let args = [
            "issue",
            "list",
            "--repo",
            repo,
            "--state",
            "all",
            "--json",
            "number,title,body,state,labels,assignees,createdAt,updatedAt,milestone",
            "--limit",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(self.limit.to_string()))
        .collect();
        CommandClient::new(self.program.clone(), args, self.timeout).current_dir(&self.checkout)
    }
}

impl Importer for GithubImporter {
    fn name(&self) -> &'static str {
        "github"
    }

    fn collect(&self) -> Result<Vec<TaskDraft>, SourceError> {
        let Some(repo) = self.resolve_repo() else {
            tracing::info!(checkout = %self.checkout.display(), "no GitHub repo configured or detected");
            return Ok(Vec::new());
        };
        let client = self.issue_client(&repo);
        let issues: Vec<Issue> =
            serde_json::from_value(client.fetch()?).map_err(|e| SourceError::Malformed {
                what: client.describe(),
                reason: e.to_string(),
            })?;
        Ok(issues.iter().map(|i| issue_to_draft(i, &repo)).collect())
    }
}

/// `owner/name` from an https or ssh GitHub remote.
pub fn parse_remote(url: &str) -> Option<String> {
    let caps = REMOTE_RE.captures(url.trim())?;
    Some(format!("{}/{}", caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

pub fn issue_to_draft(issue: &Issue, repo: &str) -> TaskDraft {
    let labels: Vec<String> = issue.labels.iter().map(|l| l.name.to_lowercase()).collect();
    let joined = labels.join("\n");
    let body = issue.body.as_deref().unwrap_or_default().trim();

    let status = if issue.state.eq_ignore_ascii_case("closed") {
        TaskStatus::Done
    } else {
        STATUS_LABELS.classify(&joined)
    };

    let mut metadata = Map::new();
    metadata.insert("githubRepo".into(), json!(repo));
    metadata.insert("githubIssueNumber".into(), json!(issue.number));
    metadata.insert(
        "githubUrl".into(),
        json!(format!("https://github.com/{repo}/issues/{}", issue.number)),
    );
    metadata.insert("githubState".into(), json!(issue.state));
    if !issue.assignees.is_empty() {
        let logins: Vec<&str> = issue.assignees.iter().map(|a| a.login.as_str()).collect();
        metadata.insert("assignees".into(), json!(logins));
    }
    if let Some(ref m) = issue.milestone {
        metadata.insert("milestone".into(), json!(m.title));
    }
    if let Some(ref created) = issue.created_at {
        metadata.insert("githubCreatedAt".into(), json!(created));
    }
    if let Some(ref updated) = issue.updated_at {
        metadata.insert("githubUpdatedAt".into(), json!(updated));
    }

    let mut tags = vec!["github".to_string(), "issue".to_string()];
    tags.extend(labels);

    let description = describe(issue, body);

    TaskDraft {
        due_date: DUE_RE
            .captures(&description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
        description,
        status,
        priority: PRIORITY_LABELS.classify(&joined),
        category: CATEGORY_LABELS.classify(&joined),
        tags,
        metadata,
        ..TaskDraft::new(
            format!("#{}: {}", issue.number, issue.title.trim()),
            TaskSource::Github,
        )
    }
}

/// Body, assignees and milestone, capped at `DESCRIPTION_LIMIT` characters.
fn describe(issue: &Issue, body: &str) -> String {
    let mut parts = Vec::new();
    if !body.is_empty() {
        parts.push(body.to_string());
    }
    if !issue.assignees.is_empty() {
        let logins: Vec<&str> = issue.assignees.iter().map(|a| a.login.as_str()).collect();
        parts.push(format!("Assignees: {}", logins.join(", ")));
    }
    if let Some(ref m) = issue.milestone {
        parts.push(format!("Milestone: {}", m.title));
    }
    parts.join("\n\n").chars().take(DESCRIPTION_LIMIT).collect()
}
