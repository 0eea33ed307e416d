use serde::Serialize;
use serde_json::{json, Value};

use crate::error::TaskboardError;
use crate::models::Task;
use crate::notify::Notification;
use crate::store::task_ops::{BulkOutcome, TaskStats};
use crate::sync::SyncReport;

pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data
    })
}

pub fn error(err: &TaskboardError) -> Value {
    json!({
        "success": false,
        "error": {
            "code": err.code.as_str(),
            "message": err.message
        }
    })
}

/// Pretty-print to stdout. Serializing a `Value` cannot fail.
pub fn print(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

pub fn task_json(t: &Task) -> Value {
    to_value(t)
}

pub fn tasks_json(tasks: &[Task]) -> Value {
    Value::Array(tasks.iter().map(task_json).collect())
}

pub fn bulk_json(outcome: &BulkOutcome) -> Value {
    json!({
        "affected": outcome.affected.len(),
        "tasks": tasks_json(&outcome.affected),
        "missing": outcome.missing
    })
}

pub fn stats_json(stats: &TaskStats) -> Value {
    to_value(stats)
}

pub fn sync_report_json(report: &SyncReport) -> Value {
    to_value(report)
}

pub fn notification_json(n: &Notification) -> Value {
    to_value(n)
}
