use chrono::NaiveDate;
use serde_json::json;

use crate::cli::commands::TaskCommands;
use crate::cli::{finish, Context};
use crate::error::TaskboardError;
use crate::models::{Category, Priority, TaskSource, TaskStatus};
use crate::output;
use crate::store::task_ops::{self, NewTask, TaskFilter, TaskPatch};

pub fn run(cmd: TaskCommands, ctx: &Context) -> i32 {
    finish(dispatch(cmd, ctx), ctx.json)
}

fn dispatch(cmd: TaskCommands, ctx: &Context) -> Result<i32, TaskboardError> {
    match cmd {
        TaskCommands::Add {
            title,
            description,
            status,
            priority,
            category,
            tags,
            due,
        } => run_add(
            ctx,
            NewTask {
                title,
                description,
                status: parse_status(status.as_deref())?,
                priority: parse_priority(priority.as_deref())?,
                category: parse_category(category.as_deref())?,
                source: None,
                tags,
                metadata: Default::default(),
                due_date: parse_due(due.as_deref())?,
            },
        ),
        TaskCommands::List {
            status,
            priority,
            category,
            source,
            tag,
        } => run_list(
            ctx,
            TaskFilter {
                status: parse_status(status.as_deref())?,
                priority: parse_priority(priority.as_deref())?,
                category: parse_category(category.as_deref())?,
                source: source.as_deref().map(TaskSource::from),
                tag,
            },
        ),
        TaskCommands::Show { id } => run_show(ctx, &id),
        TaskCommands::Update {
            id,
            title,
            description,
            status,
            priority,
            category,
            tags,
            due,
            clear_due,
        } => run_update(
            ctx,
            &id,
            TaskPatch {
                title,
                description,
                status: parse_status(status.as_deref())?,
                priority: parse_priority(priority.as_deref())?,
                category: parse_category(category.as_deref())?,
                tags: (!tags.is_empty()).then_some(tags),
                due_date: if clear_due {
                    Some(None)
                } else {
                    parse_due(due.as_deref())?.map(Some)
                },
            },
        ),
        TaskCommands::Delete { ids } => run_delete(ctx, &ids),
        TaskCommands::BulkUpdate {
            ids,
            status,
            priority,
            category,
        } => run_bulk_update(
            ctx,
            &ids,
            TaskPatch {
                status: parse_status(status.as_deref())?,
                priority: parse_priority(priority.as_deref())?,
                category: parse_category(category.as_deref())?,
                ..TaskPatch::default()
            },
        ),
    }
}

fn run_add(ctx: &Context, new: NewTask) -> Result<i32, TaskboardError> {
    let task = task_ops::create_task(&ctx.store(), new)?;
    if ctx.json {
        output::json::print(&output::json::success(json!({
            "task": output::json::task_json(&task)
        })));
    } else {
        println!("Added task: {} ({})", task.title, task.id);
    }
    Ok(0)
}

fn run_list(ctx: &Context, filter: TaskFilter) -> Result<i32, TaskboardError> {
    let tasks = task_ops::list_tasks(&ctx.store(), &filter)?;
    if ctx.json {
        output::json::print(&output::json::success(json!({
            "tasks": output::json::tasks_json(&tasks),
            "count": tasks.len()
        })));
    } else {
        output::text::print_task_list(&tasks);
    }
    Ok(0)
}

fn run_show(ctx: &Context, id: &str) -> Result<i32, TaskboardError> {
    let task = task_ops::get_task(&ctx.store(), id)?;
    if ctx.json {
        output::json::print(&output::json::success(json!({
            "task": output::json::task_json(&task)
        })));
    } else {
        output::text::print_task(&task);
    }
    Ok(0)
}

fn run_update(ctx: &Context, id: &str, patch: TaskPatch) -> Result<i32, TaskboardError> {
    let task = task_ops::update_task(&ctx.store(), id, patch)?;
    if ctx.json {
        output::json::print(&output::json::success(json!({
            "task": output::json::task_json(&task)
        })));
    } else {
        println!("Updated task: {} [{}]", task.title, task.status.as_str());
    }
    Ok(0)
}

fn run_delete(ctx: &Context, ids: &[String]) -> Result<i32, TaskboardError> {
    let outcome = task_ops::delete_tasks(&ctx.store(), ids)?;
    if ctx.json {
        output::json::print(&output::json::success(output::json::bulk_json(&outcome)));
    } else {
        for t in &outcome.affected {
            println!("Deleted task: {} ({})", t.title, t.id);
        }
        for id in &outcome.missing {
            println!("Not found: {id}");
        }
    }
    Ok(0)
}

fn run_bulk_update(ctx: &Context, ids: &[String], patch: TaskPatch) -> Result<i32, TaskboardError> {
    let outcome = task_ops::bulk_update(&ctx.store(), ids, patch)?;
    if ctx.json {
        output::json::print(&output::json::success(output::json::bulk_json(&outcome)));
    } else {
        println!("Updated {} task(s)", outcome.affected.len());
        for id in &outcome.missing {
            println!("Not found: {id}");
        }
    }
    Ok(0)
}

pub(crate) fn parse_status(s: Option<&str>) -> Result<Option<TaskStatus>, TaskboardError> {
    parse_value(s, TaskStatus::from_str, "status", "backlog, todo, in-progress, done")
}

pub(crate) fn parse_priority(s: Option<&str>) -> Result<Option<Priority>, TaskboardError> {
    parse_value(s, Priority::from_str, "priority", "low, medium, high, urgent")
}

pub(crate) fn parse_category(s: Option<&str>) -> Result<Option<Category>, TaskboardError> {
    parse_value(
        s,
        Category::from_str,
        "category",
        "automation, project, communication, maintenance",
    )
}

fn parse_value<T>(
    s: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
    expected: &str,
) -> Result<Option<T>, TaskboardError> {
    match s {
        None => Ok(None),
        Some(raw) => parse(raw).map(Some).ok_or_else(|| {
            TaskboardError::validation(format!("Invalid {field} '{raw}'. Expected one of: {expected}"))
        }),
    }
}

fn parse_due(s: Option<&str>) -> Result<Option<String>, TaskboardError> {
    match s {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(|d| Some(d.to_string()))
            .map_err(|_| {
                TaskboardError::validation(format!("Invalid due date '{raw}'. Expected YYYY-MM-DD"))
            }),
    }
}
