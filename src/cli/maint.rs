use serde_json::json;

use crate::cli::commands::MaintCommands;
use crate::cli::{finish, Context};
use crate::error::TaskboardError;
use crate::output;
use crate::store::maintenance;

pub fn run(cmd: MaintCommands, ctx: &Context) -> i32 {
    finish(run_inner(cmd, ctx), ctx.json)
}

fn run_inner(cmd: MaintCommands, ctx: &Context) -> Result<i32, TaskboardError> {
    let store = ctx.store();
    let (label, tasks) = match cmd {
        MaintCommands::ResetDaily => ("reset", maintenance::reset_daily(&store)?),
        MaintCommands::TagDaily => (
            "tagged",
            maintenance::tag_daily(&store, &ctx.config.maintenance.daily_keywords)?,
        ),
        MaintCommands::Dedupe => ("removed", maintenance::dedupe(&store)?),
    };

    if ctx.json {
        output::json::print(&output::json::success(json!({
            label: tasks.len(),
            "tasks": output::json::tasks_json(&tasks)
        })));
    } else {
        println!("{} {} task(s)", capitalize(label), tasks.len());
        output::text::print_task_list(&tasks);
    }
    Ok(0)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
