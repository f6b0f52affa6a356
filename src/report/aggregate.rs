use serde::Serialize;
use std::path::PathBuf;

use crate::probes::{ProbeOutcome, ProbeResult, ResultRecord, Severity};

/// Records of one class within a severity bucket, execution order
#[derive(Debug, Clone, Serialize)]
pub struct ClassGroup {
    pub class: String,
    pub records: Vec<ResultRecord>,
}

/// All records of one severity, grouped by class in first-seen order
#[derive(Debug, Clone, Serialize)]
pub struct SeverityGroup {
    pub severity: Severity,
    pub classes: Vec<ClassGroup>,
}

impl SeverityGroup {
    pub fn total(&self) -> usize {
        self.classes.iter().map(|group| group.records.len()).sum()
    }
}

/// A failed or rejected probe, with its classification reason
#[derive(Debug, Clone, Serialize)]
pub struct ProbeError {
    pub probe_path: PathBuf,
    pub reason: String,
}

/// Summary statistics over one analysis run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportCounts {
    /// Probes considered (every probe the executor ran)
    pub total: usize,
    /// Probes that applied and produced a record
    pub applied: usize,
    /// Probes that reported themselves inapplicable
    pub not_applicable: usize,
    /// Probes that failed or violated the output protocol
    pub errors: usize,
    pub critical: usize,
    pub warning: usize,
    pub recommended: usize,
    pub success: usize,
}

impl ReportCounts {
    pub fn for_severity(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Recommended => self.recommended,
            Severity::Success => self.success,
        }
    }

    /// One-line digest, suitable for a notification subject
    pub fn summary_line(&self) -> String {
        format!(
            "{} critical, {} warning, {} recommended, {} success ({} of {} checks applied, {} failed)",
            self.critical,
            self.warning,
            self.recommended,
            self.success,
            self.applied,
            self.total,
            self.errors
        )
    }
}

/// Severity- and class-grouped view over one run's probe results.
/// Recomputed from scratch on every run, never updated in place.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedReport {
    /// Distinct classes in order of first appearance
    pub classes: Vec<String>,
    /// One group per severity level, most severe first
    pub by_severity: Vec<SeverityGroup>,
    pub errors: Vec<ProbeError>,
    pub counts: ReportCounts,
}

impl AggregatedReport {
    pub fn severity_group(&self, severity: Severity) -> Option<&SeverityGroup> {
        self.by_severity.iter().find(|g| g.severity == severity)
    }
}

/// Fold a complete result set into its severity- and class-grouped report.
pub fn aggregate(results: &[ProbeResult]) -> AggregatedReport {
    let mut records: Vec<&ResultRecord> = Vec::new();
    let mut errors = Vec::new();
    let mut counts = ReportCounts {
        total: results.len(),
        ..ReportCounts::default()
    };

    for result in results {
        match &result.outcome {
            ProbeOutcome::Record(record) => {
                counts.applied += 1;
                match record.severity {
                    Severity::Critical => counts.critical += 1,
                    Severity::Warning => counts.warning += 1,
                    Severity::Recommended => counts.recommended += 1,
                    Severity::Success => counts.success += 1,
                }
                records.push(record);
            }
            ProbeOutcome::NotApplicable => counts.not_applicable += 1,
            ProbeOutcome::Failed(failure) => {
                counts.errors += 1;
                errors.push(ProbeError {
                    probe_path: result.probe_path.clone(),
                    reason: failure.to_string(),
                });
            }
        }
    }

    let mut classes: Vec<String> = Vec::new();
    for record in &records {
        if !classes.contains(&record.class) {
            classes.push(record.class.clone());
        }
    }

    let by_severity = Severity::REPORT_ORDER
        .into_iter()
        .map(|severity| SeverityGroup {
            severity,
            classes: classes
                .iter()
                .filter_map(|class| {
                    let matching: Vec<ResultRecord> = records
                        .iter()
                        .filter(|r| r.severity == severity && &r.class == class)
                        .map(|r| (*r).clone())
                        .collect();
                    if matching.is_empty() {
                        None
                    } else {
                        Some(ClassGroup {
                            class: class.clone(),
                            records: matching,
                        })
                    }
                })
                .collect(),
        })
        .collect();

    AggregatedReport {
        classes,
        by_severity,
        errors,
        counts,
    }
}
