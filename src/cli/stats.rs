use crate::cli::{finish, Context};
use crate::error::TaskboardError;
use crate::output;
use crate::store::task_ops;

pub fn run(ctx: &Context) -> i32 {
    finish(run_inner(ctx), ctx.json)
}

fn run_inner(ctx: &Context) -> Result<i32, TaskboardError> {
    let stats = task_ops::task_stats(&ctx.store())?;
    if ctx.json {
        output::json::print(&output::json::success(output::json::stats_json(&stats)));
    } else {
        output::text::print_stats(&stats);
    }
    Ok(0)
}
