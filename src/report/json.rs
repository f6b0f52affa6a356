use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{ReportGenerator, ReportResult};
use crate::analysis::AnalysisOutcome;
use crate::report::aggregate::AggregatedReport;
use crate::snapshot::{ProductIdentity, SystemProfile};

/// JSON report structure with all relevant data
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Report metadata
    pub metadata: ReportMetadata,

    /// Analyzed system identity
    pub system: SystemInfo<'a>,

    /// Grouped results, error list and summary counts
    pub results: &'a AggregatedReport,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub report_generated_at: String,
    pub tool_version: String,
    pub run_id: String,
    pub snapshot_directory: String,
    pub analysis_started_at: String,
    pub analysis_finished_at: String,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo<'a> {
    pub profile: &'a SystemProfile,
    pub products: &'a [ProductIdentity],
    pub pattern_filter: &'a [String],
}

/// JSON report generator
pub struct JsonReporter;

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, outcome: &AnalysisOutcome) -> ReportResult<String> {
        let report = JsonReport {
            metadata: ReportMetadata {
                report_generated_at: chrono::Utc::now().to_rfc3339(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                run_id: outcome.run_id.clone(),
                snapshot_directory: outcome.snapshot_dir.display().to_string(),
                analysis_started_at: outcome.started_at.to_rfc3339(),
                analysis_finished_at: outcome.finished_at.to_rfc3339(),
            },
            system: SystemInfo {
                profile: &outcome.profile,
                products: &outcome.fingerprint.products,
                pattern_filter: &outcome.filter_labels,
            },
            results: &outcome.report,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    pub fn save_report(&self, outcome: &AnalysisOutcome, output_path: &Path) -> ReportResult<()> {
        let json = self.render(outcome)?;
        let mut file = File::create(output_path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl ReportGenerator for JsonReporter {
    fn generate(&self, outcome: &AnalysisOutcome, output_path: &Path) -> ReportResult<()> {
        self.save_report(outcome, output_path)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{ProbeFailure, ProbeResult};
    use crate::report::aggregate::aggregate;
    use crate::snapshot::Fingerprint;
    use std::path::PathBuf;

    fn outcome() -> AnalysisOutcome {
        let results = vec![ProbeResult::failed(
            "/patterns/local/broken",
            ProbeFailure::Output("oops".to_string()),
        )];
        AnalysisOutcome {
            run_id: "run-1".to_string(),
            started_at: chrono::Utc::now(),
            finished_at: chrono::Utc::now(),
            snapshot_dir: PathBuf::from("/tmp/nts_host"),
            snapshot_name: "nts_host".to_string(),
            fingerprint: Fingerprint {
                products: vec![crate::snapshot::ProductIdentity {
                    tag: "sle".to_string(),
                    pattern_tag: "SLE".to_string(),
                    major_version: "15".to_string(),
                    minor_version: "3".to_string(),
                }],
            },
            profile: Default::default(),
            filter_labels: vec!["local".to_string()],
            report: aggregate(&results),
        }
    }

    #[test]
    fn rendered_json_is_valid_and_complete() {
        let json = JsonReporter::new().render(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["run_id"], "run-1");
        assert_eq!(value["system"]["products"][0]["tag"], "sle");
        assert_eq!(value["results"]["counts"]["errors"], 1);
        assert_eq!(
            value["results"]["errors"][0]["reason"],
            "Output error: oops"
        );
    }
}
