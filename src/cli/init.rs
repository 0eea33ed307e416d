use serde_json::json;

use crate::cli::{finish, Context};
use crate::config;
use crate::error::TaskboardError;
use crate::output;

pub fn run(ctx: &Context) -> i32 {
    finish(run_inner(ctx), ctx.json)
}

fn run_inner(ctx: &Context) -> Result<i32, TaskboardError> {
    let config_written = config::write_default_config(&ctx.home)?;
    let store = ctx.store();
    let store_created = store.init()?;

    if ctx.json {
        output::json::print(&output::json::success(json!({
            "home": ctx.home.to_string_lossy(),
            "store": store.path().to_string_lossy(),
            "config": config::config_file(&ctx.home).to_string_lossy(),
            "created": store_created,
            "configWritten": config_written
        })));
    } else if store_created {
        println!("Initialized taskboard at {}", ctx.home.display());
    } else {
        println!("Taskboard already initialized at {}", ctx.home.display());
    }
    Ok(0)
}
