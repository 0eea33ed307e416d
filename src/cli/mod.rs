pub mod commands;
pub mod init;
pub mod maint;
pub mod notify;
pub mod search;
pub mod stats;
pub mod sync;
pub mod task;

use std::path::{Path, PathBuf};

pub use commands::*;

use crate::config::{self, Config};
use crate::error::TaskboardError;
use crate::output;
use crate::store::JsonStore;

/// Everything a command needs after resolving `--home`.
pub struct Context {
    pub home: PathBuf,
    pub config: Config,
    pub json: bool,
}

impl Context {
    pub fn load(home_flag: Option<&Path>, json: bool) -> Result<Self, TaskboardError> {
        let home = config::resolve_home(home_flag)?;
        let config = config::load_config(&home)?;
        Ok(Self { home, config, json })
    }

    pub fn store(&self) -> JsonStore {
        JsonStore::new(self.config.store_path(&self.home))
    }
}

/// Render an error the way every command does and map to an exit code.
pub fn finish(result: Result<i32, TaskboardError>, json_output: bool) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            report_error(&e, json_output);
            1
        }
    }
}

pub fn report_error(e: &TaskboardError, json_output: bool) {
    tracing::debug!(code = e.code.as_str(), "command failed");
    if json_output {
        output::json::print(&output::json::error(e));
    } else {
        eprintln!("Error: {}", e.message);
    }
}
