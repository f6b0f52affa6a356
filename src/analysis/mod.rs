use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::catalog::{CatalogError, PatternCatalog};
use crate::probes::executor::{ProbeExecutor, DEFAULT_PROBE_TIMEOUT};
use crate::report::aggregate::{aggregate, AggregatedReport};
use crate::snapshot::fingerprint::fingerprint;
use crate::snapshot::{Fingerprint, Snapshot, SnapshotError, SystemProfile};

/// Errors that end an analysis run before any probe executes
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// One analysis run: fingerprint the snapshot, resolve the applicable
/// probes, execute them and aggregate the outcome. All run state lives in
/// this context, so runs can repeat or overlap within one process.
pub struct AnalysisRun {
    snapshot: Snapshot,
    patterns_dir: PathBuf,
    jobs: usize,
    probe_timeout: Duration,
    progress: Option<ProgressBar>,
}

/// Everything a run produces, handed to the report renderers
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub snapshot_dir: PathBuf,
    pub snapshot_name: String,
    pub fingerprint: Fingerprint,
    pub profile: SystemProfile,
    pub filter_labels: Vec<String>,
    pub report: AggregatedReport,
}

impl AnalysisRun {
    pub fn new(snapshot: Snapshot, patterns_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot,
            patterns_dir: patterns_dir.into(),
            jobs: 1,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            progress: None,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn execute(self) -> Result<AnalysisOutcome, AnalysisError> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        let (fingerprint, profile) = fingerprint(&self.snapshot)?;
        info!("System definition: {}", fingerprint.describe());

        let catalog = PatternCatalog::new(&self.patterns_dir);
        let resolved = catalog.resolve(&fingerprint)?;
        info!("Pattern filter: {}", resolved.filter_labels.join(" "));

        let probes = resolved.probe_paths();
        if probes.is_empty() {
            warn!(
                "No applicable probes found under {}",
                self.patterns_dir.display()
            );
        }
        if let Some(bar) = &self.progress {
            bar.set_length(probes.len() as u64);
        }

        let mut executor = ProbeExecutor::new(self.snapshot.dir())
            .with_jobs(self.jobs)
            .with_probe_timeout(self.probe_timeout);
        if let Some(bar) = &self.progress {
            executor = executor.with_progress(bar.clone());
        }

        let results = executor.run_all(&probes).await;
        let report = aggregate(&results);
        info!("Analysis complete: {}", report.counts.summary_line());

        Ok(AnalysisOutcome {
            run_id,
            started_at,
            finished_at: Utc::now(),
            snapshot_dir: self.snapshot.dir().to_path_buf(),
            snapshot_name: self.snapshot.name(),
            fingerprint,
            profile,
            filter_labels: resolved.filter_labels,
            report,
        })
    }
}
