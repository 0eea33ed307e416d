pub mod cron;
pub mod github;
pub mod heartbeat;
pub mod memory;
pub mod project;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TaskDraft;

use super::source::SourceError;

pub use cron::CronImporter;
pub use github::GithubImporter;
pub use heartbeat::HeartbeatImporter;
pub use memory::MemoryImporter;
pub use project::ProjectImporter;

/// Source names in the order a full sync runs them.
pub const SOURCE_NAMES: [&str; 5] = ["cron", "heartbeat", "memory", "project", "github"];

/// `- [ ] text`, `* [x] text`, `[✓] text`.
pub(crate) static CHECKBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s\-*]*\[([ xX✓])\]\s*(.+?)\s*$").expect("valid checkbox regex")
});

/// One source of sync candidates.
pub trait Importer {
    fn name(&self) -> &'static str;

    /// Fetch and map. Errors mean the whole source was unusable.
    fn collect(&self) -> Result<Vec<TaskDraft>, SourceError>;

    /// `collect`, degraded to an empty list with a warning on failure.
    fn import(&self) -> Vec<TaskDraft> {
        match self.collect() {
            Ok(drafts) => {
                tracing::info!(source = self.name(), candidates = drafts.len(), "source imported");
                drafts
            }
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "source skipped");
                Vec::new()
            }
        }
    }
}

/// Split a checkbox line into (checked, text).
pub(crate) fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
    let caps = CHECKBOX_RE.captures(line)?;
    let mark = caps.get(1)?.as_str();
    let text = caps.get(2)?.as_str();
    Some((mark != " ", text))
}
