use serde_json::json;

use crate::cli::{finish, Context};
use crate::error::TaskboardError;
use crate::output;
use crate::store::task_ops;

pub fn run(query: &str, ctx: &Context) -> i32 {
    finish(run_inner(query, ctx), ctx.json)
}

fn run_inner(query: &str, ctx: &Context) -> Result<i32, TaskboardError> {
    let tasks = task_ops::search_tasks(&ctx.store(), query)?;
    if ctx.json {
        output::json::print(&output::json::success(json!({
            "query": query,
            "tasks": output::json::tasks_json(&tasks),
            "count": tasks.len()
        })));
    } else {
        output::text::print_task_list(&tasks);
    }
    Ok(0)
}
