use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::cli::{finish, Context};
use crate::error::TaskboardError;
use crate::notify::{self, Notification, StatusTracker};
use crate::output;

pub fn run_notify(title: &str, status: &str, ctx: &Context) -> i32 {
    finish(notify_inner(title, status, ctx), ctx.json)
}

fn notify_inner(title: &str, status: &str, ctx: &Context) -> Result<i32, TaskboardError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskboardError::validation("Task title must not be empty"));
    }
    let status = status.trim().to_lowercase();
    let notification = Notification::new(title, &status, Utc::now());
    let queue = ctx.config.queue_path(&ctx.home);
    notify::enqueue(&queue, &notification)?;

    if ctx.json {
        output::json::print(&output::json::success(json!({
            "queue": queue.to_string_lossy(),
            "notification": output::json::notification_json(&notification)
        })));
    } else {
        println!("Queued notification: {}", notification.message);
    }
    Ok(0)
}

/// Poll until killed. The first snapshot only primes the tracker.
pub fn run_watch(interval_secs: u64, ctx: &Context) -> i32 {
    let store = ctx.store();
    let queue = ctx.config.queue_path(&ctx.home);
    let interval = Duration::from_secs(interval_secs.max(1));
    let mut tracker = StatusTracker::new();

    match store.load() {
        Ok(doc) => tracker.prime(&doc.tasks),
        Err(e) => return finish(Err(e), ctx.json),
    }
    tracing::info!(
        store = %store.path().display(),
        tracked = tracker.tracked(),
        "watching for status changes"
    );
    if !ctx.json {
        println!("Watching {} ({} tasks)", store.path().display(), tracker.tracked());
    }

    loop {
        thread::sleep(interval);
        let doc = match store.load() {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(code = e.code.as_str(), error = %e, "watch: store unreadable");
                continue;
            }
        };
        for notification in tracker.observe(&doc.tasks, Utc::now()) {
            match notify::enqueue(&queue, &notification) {
                Ok(()) if ctx.json => {
                    output::json::print(&output::json::notification_json(&notification))
                }
                Ok(()) => println!("Queued notification: {}", notification.message),
                Err(e) => tracing::warn!(error = %e, "watch: failed to queue notification"),
            }
        }
    }
}
