use crate::analysis::DocumentAnalyzer;
use crate::assembler::DocumentAssembler;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::storage::{is_supported_format, results_blob_name, BlobStore, LOAN_TERMS_SUFFIX, RESULTS_SUFFIX};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_READ_URL_TTL: Duration = Duration::from_secs(3600);

/// What happened to one source item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Persisted { results_name: String },
    Skipped { reason: String },
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub outcome: ItemOutcome,
    pub elapsed_ms: u64,
}

/// Result of one batch run, in source order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn persisted(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Persisted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn outcome(&self, name: &str) -> Option<&ItemOutcome> {
        self.items.iter().find(|i| i.name == name).map(|i| &i.outcome)
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

/// Runs sources through fetch → analyze → assemble → persist.
///
/// Items are isolated: an error in one becomes that item's `ItemOutcome`
/// and the batch moves on.
pub struct PipelineDriver {
    store: Box<dyn BlobStore>,
    analyzer: Box<dyn DocumentAnalyzer>,
    assembler: DocumentAssembler,
    read_url_ttl: Duration,
    workers: usize,
}

impl PipelineDriver {
    pub fn new(store: Box<dyn BlobStore>, analyzer: Box<dyn DocumentAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            assembler: DocumentAssembler::new(),
            read_url_ttl: DEFAULT_READ_URL_TTL,
            workers: 1,
        }
    }

    pub fn with_read_url_ttl(mut self, ttl: Duration) -> Self {
        self.read_url_ttl = ttl;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn store(&self) -> &dyn BlobStore {
        self.store.as_ref()
    }

    /// Process every blob in the store except pipeline artifacts.
    pub fn run_container(&self) -> Result<BatchReport> {
        let sources: Vec<String> = self
            .store
            .list()?
            .into_iter()
            .filter(|name| {
                let artifact = name.ends_with(RESULTS_SUFFIX) || name.ends_with(LOAN_TERMS_SUFFIX);
                if artifact {
                    debug!(item = %name, "ignoring pipeline artifact");
                }
                !artifact
            })
            .collect();
        self.run(&sources)
    }

    pub fn run(&self, sources: &[String]) -> Result<BatchReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %run_id,
            items = sources.len(),
            workers = self.workers,
            store = self.store.name(),
            analyzer = self.analyzer.name(),
            "batch started"
        );

        let items: Vec<ItemReport> = if self.workers > 1 && sources.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(|e| PipelineError::Configuration(format!("worker pool: {e}")))?;
            pool.install(|| sources.par_iter().map(|name| self.run_item(name)).collect::<Vec<_>>())
        } else {
            sources.iter().map(|name| self.run_item(name)).collect()
        };

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            items,
        };
        info!(
            %run_id,
            persisted = report.persisted(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    fn run_item(&self, name: &str) -> ItemReport {
        let start = Instant::now();
        let outcome = match self.process_item(name) {
            Ok(results_name) => {
                info!(item = %name, results = %results_name, "analysis persisted");
                ItemOutcome::Persisted { results_name }
            }
            Err(err @ PipelineError::UnsupportedFormat { .. }) => {
                warn!(item = %name, kind = ?err.kind(), "skipping item: {err}");
                ItemOutcome::Skipped {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                warn!(item = %name, kind = ?err.kind(), "item failed: {err}");
                ItemOutcome::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };

        ItemReport {
            name: name.to_string(),
            outcome,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Analyze one source and persist `<name>_results.json`. Returns the
    /// name of the written blob.
    pub fn process_item(&self, name: &str) -> Result<String> {
        if !is_supported_format(name) {
            return Err(PipelineError::UnsupportedFormat {
                name: name.to_string(),
            });
        }

        let url = self.store.generate_read_url(name, self.read_url_ttl)?;
        let document = self.store.fetch(&url)?;
        debug!(item = %name, bytes = document.len(), "document fetched");

        let raw = self.analyzer.analyze(&document)?;
        let result = self.assembler.assemble(&raw);

        let results_name = results_blob_name(name);
        self.store.write(&results_name, &result.to_pretty_json()?)?;
        Ok(results_name)
    }
}
