pub mod importers;
pub mod merge;
pub mod rules;
pub mod source;

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::error::TaskboardError;
use crate::models::TaskDraft;
use crate::store::JsonStore;

use importers::{
    CronImporter, GithubImporter, HeartbeatImporter, Importer, MemoryImporter, ProjectImporter,
    SOURCE_NAMES,
};
use rules::Classifier;
use source::{CommandClient, FileClient, SourceClient};

#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    pub name: String,
    pub candidates: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub candidates: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub saved: bool,
    pub dry_run: bool,
    pub sources: Vec<SourceCount>,
}

/// Runs the enabled importers and folds their output into the store.
pub struct SyncManager {
    importers: Vec<Box<dyn Importer>>,
}

impl SyncManager {
    pub fn new(importers: Vec<Box<dyn Importer>>) -> Self {
        Self { importers }
    }

    /// Build every enabled importer. Relative paths resolve against `home`.
    pub fn from_config(home: &Path, config: &Config) -> Result<Self, TaskboardError> {
        let classifier = Classifier::from_config(&config.rules)?;
        let timeout = Duration::from_secs(config.sync.command_timeout_secs.max(1));
        let sources = &config.sources;
        let mut importers: Vec<Box<dyn Importer>> = Vec::new();

        if sources.cron.enabled {
            let client: Option<Box<dyn SourceClient>> = match sources.cron.file {
                Some(ref file) => Some(Box::new(FileClient::new(config.resolve(home, file)))),
                None => CommandClient::from_argv(&sources.cron.command, timeout)
                    .map(|c| Box::new(c.current_dir(home)) as Box<dyn SourceClient>),
            };
            match client {
                Some(client) => importers.push(Box::new(CronImporter::new(client, classifier.clone()))),
                None => tracing::warn!("cron source enabled without a file or command"),
            }
        }
        if sources.heartbeat.enabled {
            let path = config.resolve(home, &sources.heartbeat.path);
            importers.push(Box::new(HeartbeatImporter::new(Box::new(FileClient::new(path)))));
        }
        if sources.memory.enabled {
            importers.push(Box::new(MemoryImporter::new(
                config.resolve(home, &sources.memory.dir),
                sources.memory.max_age_days,
                classifier.clone(),
            )));
        }
        if sources.project.enabled {
            let roots = sources
                .project
                .roots
                .iter()
                .map(|r| config.resolve(home, r))
                .collect();
            importers.push(Box::new(ProjectImporter::new(
                roots,
                sources.project.file_name.clone(),
                sources.project.ignore.clone(),
                classifier.clone(),
            )));
        }
        if sources.github.enabled {
            let checkout = sources
                .github
                .checkout
                .as_deref()
                .map(|p| config.resolve(home, p))
                .unwrap_or_else(|| home.to_path_buf());
            importers.push(Box::new(GithubImporter::new(
                sources.github.repo.clone(),
                checkout,
                sources.github.command.clone(),
                sources.github.limit,
                timeout,
            )));
        }

        Ok(Self::new(importers))
    }

    /// Keep only the named sources. Unknown names are rejected; known but
    /// disabled ones simply contribute nothing.
    pub fn only(mut self, names: &[String]) -> Result<Self, TaskboardError> {
        if names.is_empty() {
            return Ok(self);
        }
        let wanted: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
        if let Some(bad) = wanted.iter().find(|n| !SOURCE_NAMES.contains(&n.as_str())) {
            return Err(TaskboardError::validation(format!(
                "Unknown source '{bad}'. Expected one of: {}",
                SOURCE_NAMES.join(", ")
            )));
        }
        self.importers.retain(|i| wanted.iter().any(|n| n == i.name()));
        Ok(self)
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.importers.iter().map(|i| i.name()).collect()
    }

    /// Candidates from every importer in order. A failing source yields none.
    pub fn collect(&self) -> (Vec<TaskDraft>, Vec<SourceCount>) {
        let mut drafts = Vec::new();
        let mut counts = Vec::with_capacity(self.importers.len());
        for importer in &self.importers {
            let batch = importer.import();
            counts.push(SourceCount {
                name: importer.name().to_string(),
                candidates: batch.len(),
            });
            drafts.extend(batch);
        }
        (drafts, counts)
    }

    /// Load, merge, and save when anything changed. A store that cannot be
    /// read fails the sync before any importer runs.
    pub fn run(&self, store: &JsonStore, dry_run: bool) -> Result<SyncReport, TaskboardError> {
        let mut doc = store.load()?;
        let (candidates, sources) = self.collect();
        let total = candidates.len();

        let outcome = merge::merge(std::mem::take(&mut doc.tasks), candidates);
        let changed = outcome.changed();
        let report = SyncReport {
            candidates: total,
            added: outcome.added,
            updated: outcome.updated,
            unchanged: outcome.unchanged,
            saved: changed && !dry_run,
            dry_run,
            sources,
        };

        if report.saved {
            doc.tasks = outcome.tasks;
            store.save(&mut doc)?;
        }
        tracing::info!(
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            saved = report.saved,
            "sync finished"
        );
        Ok(report)
    }
}
