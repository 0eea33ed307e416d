use std::path::PathBuf;

use clap::{Parser, Subcommand};

const VERSION: &str = env!("TASKBOARD_VERSION");

#[derive(Parser)]
#[command(
    name = "taskboard",
    version = VERSION,
    about = "Personal task board backed by a JSON file, synced from cron jobs, notes and issues",
    after_help = "\
HOME:
  Store, config and notification queue live in one directory:
  --home <dir>, else $TASKBOARD_HOME, else the platform data directory.
  Run `taskboard init` before any other command.

EXIT CODES:
  0  Success
  1  Error (not initialized, malformed store, validation, unknown task, etc.)

VALUES:
  status:   backlog | todo | in-progress | done
  priority: low | medium | high | urgent
  category: automation | project | communication | maintenance
  source:   manual | cron | heartbeat | memory | project | github

SYNC RULES:
  Imported records are matched by identity (cron id, issue number, file + title, title).
  A sync only changes the status of a matching, not-done record from the same source.
  Manual tasks are never touched by sync. Nothing is ever removed by sync."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Taskboard home directory
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the home directory, default config and an empty store
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Case-insensitive search over title, description, tags and labels
    Search {
        query: String,
    },

    /// Counts by status, priority and category
    Stats,

    /// Import from configured sources and merge into the store
    #[command(after_help = "\
NOTE:
  Sources: cron, heartbeat, memory, project, github (in that order).
  An unavailable source contributes nothing; the others still sync.
  The store is only rewritten when something was added or changed.
  With --every, runs forever; a failed cycle is logged and retried next tick.")]
    Sync {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Only sync these sources (repeatable)
        #[arg(long = "source", value_name = "NAME")]
        sources: Vec<String>,

        /// Repeat every N seconds
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },

    /// Housekeeping passes
    #[command(subcommand)]
    Maint(MaintCommands),

    /// Queue a task notification
    Notify {
        /// Task title
        title: String,
        #[arg(long, default_value = "in-progress")]
        status: String,
    },

    /// Poll the store and queue a notification when a task starts or completes
    Watch {
        #[arg(long, value_name = "SECS", default_value_t = 2)]
        interval: u64,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task by hand
    Add {
        /// Task title
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show task details
    Show {
        id: String,
    },
    /// Change fields of a task
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Replace tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete one or more tasks
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Set status/priority/category on many tasks
    BulkUpdate {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MaintCommands {
    /// Move done tasks tagged `daily` back to todo
    ResetDaily,
    /// Tag tasks mentioning a daily keyword
    TagDaily,
    /// Remove imported records duplicating an earlier one
    Dedupe,
}
