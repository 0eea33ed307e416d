use std::thread;
use std::time::Duration;

use crate::cli::{finish, report_error, Context};
use crate::error::TaskboardError;
use crate::output;
use crate::sync::SyncManager;

pub fn run(dry_run: bool, sources: &[String], every: Option<u64>, ctx: &Context) -> i32 {
    let manager = match build(sources, ctx) {
        Ok(m) => m,
        Err(e) => return finish(Err(e), ctx.json),
    };

    let Some(secs) = every else {
        return finish(run_once(&manager, dry_run, ctx), ctx.json);
    };

    let interval = Duration::from_secs(secs.max(1));
    tracing::info!(interval_secs = interval.as_secs(), "sync loop started");
    loop {
        if let Err(e) = run_once(&manager, dry_run, ctx) {
            tracing::warn!(code = e.code.as_str(), error = %e, "sync cycle failed");
            report_error(&e, ctx.json);
        }
        thread::sleep(interval);
    }
}

fn build(sources: &[String], ctx: &Context) -> Result<SyncManager, TaskboardError> {
    SyncManager::from_config(&ctx.home, &ctx.config)?.only(sources)
}

fn run_once(manager: &SyncManager, dry_run: bool, ctx: &Context) -> Result<i32, TaskboardError> {
    let report = manager.run(&ctx.store(), dry_run)?;
    if ctx.json {
        output::json::print(&output::json::success(output::json::sync_report_json(&report)));
    } else {
        output::text::print_sync_report(&report);
    }
    Ok(0)
}
