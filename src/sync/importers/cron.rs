use chrono::DateTime;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::models::{TaskDraft, TaskSource, TaskStatus};
use crate::sync::rules::Classifier;
use crate::sync::source::{SourceClient, SourceError};

use super::Importer;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schedule: Value,
    #[serde(default)]
    pub payload: Value,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub created_at_ms: Option<i64>,
    #[serde(default)]
    pub state: CronJobState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobState {
    #[serde(default)]
    pub next_run_at_ms: Option<i64>,
    #[serde(default)]
    pub last_run_at_ms: Option<i64>,
}

fn default_enabled() -> bool {
    true
}

pub struct CronImporter {
    client: Box<dyn SourceClient>,
    classifier: Classifier,
}

impl CronImporter {
    pub fn new(client: Box<dyn SourceClient>, classifier: Classifier) -> Self {
        Self { client, classifier }
    }
}

impl Importer for CronImporter {
    fn name(&self) -> &'static str {
        "cron"
    }

    fn collect(&self) -> Result<Vec<TaskDraft>, SourceError> {
        let jobs = parse_jobs(&self.client.describe(), self.client.fetch()?)?;
        Ok(jobs.iter().map(|job| job_to_draft(job, &self.classifier)).collect())
    }
}

/// Accepts `{ "jobs": [...] }` or a bare array. Entries that do not look like
/// jobs are skipped.
pub fn parse_jobs(what: &str, value: Value) -> Result<Vec<CronJob>, SourceError> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("jobs") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(SourceError::Malformed {
                    what: what.to_string(),
                    reason: "`jobs` is not an array".into(),
                })
            }
        },
        _ => {
            return Err(SourceError::Malformed {
                what: what.to_string(),
                reason: "expected a job list".into(),
            })
        }
    };

    Ok(list
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<CronJob>(item) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::warn!(source = what, error = %e, "skipping malformed cron job");
                None
            }
        })
        .collect())
}

/// Disabled jobs are kept as backlog so the board still shows them.
pub fn job_to_draft(job: &CronJob, classifier: &Classifier) -> TaskDraft {
    let name = job
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Unnamed Job")
        .to_string();
    let payload_text = payload_message(&job.payload).unwrap_or_default();
    let classify_text = format!("{name}\n{payload_text}");

    let mut tags = vec!["cron".to_string()];
    if is_daily(&job.schedule) {
        tags.push("daily".to_string());
    }

    let mut metadata = Map::new();
    if let Some(id) = scalar(&job.id) {
        metadata.insert("cronId".into(), json!(id));
    }
    metadata.insert("schedule".into(), job.schedule.clone());
    metadata.insert("enabled".into(), json!(job.enabled));
    if let Some(ms) = job.state.next_run_at_ms {
        metadata.insert("nextRunAtMs".into(), json!(ms));
    }
    if let Some(ms) = job.state.last_run_at_ms {
        metadata.insert("lastRunAtMs".into(), json!(ms));
    }

    TaskDraft {
        description: format!(
            "Schedule: {}\n\nPayload: {}\n\nStatus: {}",
            describe_schedule(&job.schedule),
            describe_payload(&job.payload),
            if job.enabled { "Enabled" } else { "Disabled" }
        ),
        status: if job.enabled {
            TaskStatus::Todo
        } else {
            TaskStatus::Backlog
        },
        priority: classifier.cron_priority.classify(&name),
        category: classifier.cron_category.classify(&classify_text),
        tags,
        metadata,
        due_date: job
            .state
            .next_run_at_ms
            .and_then(DateTime::from_timestamp_millis)
            .map(|d| d.date_naive().to_string()),
        ..TaskDraft::new(name, TaskSource::Cron)
    }
}

/// A schedule recurs daily when it fires every day of every month, or runs on
/// a one-day interval.
pub fn is_daily(schedule: &Value) -> bool {
    let expr = match schedule {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => match map.get("kind").and_then(Value::as_str) {
            Some("every") => {
                return map.get("everyMs").and_then(Value::as_u64) == Some(DAY_MS);
            }
            Some("cron") | None => map.get("expr").and_then(Value::as_str),
            _ => None,
        },
        _ => None,
    };
    let Some(expr) = expr else {
        return false;
    };
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let calendar = match fields.len() {
        5 => &fields[2..5],
        6 => &fields[3..6],
        _ => return false,
    };
    calendar.iter().all(|f| *f == "*" || *f == "?")
}

fn describe_schedule(schedule: &Value) -> String {
    match schedule {
        Value::Null => "Unknown".to_string(),
        Value::String(expr) => format!("Cron: {expr}"),
        Value::Object(map) => match map.get("kind").and_then(Value::as_str) {
            Some("cron") => {
                let expr = map.get("expr").and_then(Value::as_str).unwrap_or("?");
                match map.get("tz").and_then(Value::as_str) {
                    Some(tz) => format!("Cron: {expr} ({tz})"),
                    None => format!("Cron: {expr}"),
                }
            }
            Some("every") => {
                let minutes = map.get("everyMs").and_then(Value::as_u64).unwrap_or(0) / 60_000;
                format!("Every {minutes} minutes")
            }
            Some("at") => map
                .get("atMs")
                .and_then(Value::as_i64)
                .and_then(DateTime::from_timestamp_millis)
                .map(|d| format!("One-time: {}", d.to_rfc3339()))
                .unwrap_or_else(|| "One-time".to_string()),
            _ => schedule.to_string(),
        },
        other => other.to_string(),
    }
}

fn payload_message(payload: &Value) -> Option<String> {
    let map = payload.as_object()?;
    map.get("message")
        .or_else(|| map.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn describe_payload(payload: &Value) -> String {
    match payload {
        Value::Null => "None".to_string(),
        Value::Object(map) => match map.get("kind").and_then(Value::as_str) {
            Some("systemEvent") => format!(
                "System Event: {}",
                map.get("text").and_then(Value::as_str).unwrap_or("")
            ),
            Some("agentTurn") => payload_message(payload).unwrap_or_else(|| "Agent task".into()),
            _ => payload.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
