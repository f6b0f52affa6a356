pub mod executor;
pub mod parser;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum number of pipe-delimited fields a probe must emit
pub const MIN_OUTPUT_FIELDS: usize = 8;

/// Severity levels of the pattern output protocol.
///
/// The numeric codes are part of the wire contract with the installed
/// pattern ecosystem: 2 is reserved and maps to no level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "recommended")]
    Recommended,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "critical")]
    Critical,
}

impl Severity {
    /// Report rendering order, most severe first
    pub const REPORT_ORDER: [Severity; 4] = [
        Severity::Critical,
        Severity::Warning,
        Severity::Recommended,
        Severity::Success,
    ];

    pub fn code(&self) -> i64 {
        match self {
            Severity::Success => 0,
            Severity::Recommended => 1,
            Severity::Warning => 3,
            Severity::Critical => 4,
        }
    }

    /// Map a protocol code to a level. Codes outside the protocol window
    /// and the reserved value 2 return `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Severity::Success),
            1 => Some(Severity::Recommended),
            3 => Some(Severity::Warning),
            4 => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "Success",
            Severity::Recommended => "Recommended",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

/// One reference link carried by a result record.
///
/// `key` is the full field tag (e.g. `META_LINK_TID`), `label` the portion
/// after its last underscore, `url` everything after the field's first `=`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub key: String,
    pub label: String,
    pub url: String,
}

/// Parsed, validated output of one applicable probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    pub probe_path: PathBuf,
    pub class: String,
    pub category: String,
    pub component: String,
    pub pattern_id: String,
    pub primary_link_key: String,
    pub severity: Severity,
    pub message: String,
    pub links: Vec<Link>,
}

impl ResultRecord {
    /// The link designated by `primary_link_key`, if any. Rendering treats
    /// an unresolved key as an empty link rather than an error.
    pub fn primary_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.key == self.primary_link_key)
    }
}

/// Per-probe failure classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFailure {
    /// Process could not be started or crashed unexpectedly
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Process wrote to stderr; carries the first stderr line
    #[error("Output error: {0}")]
    Output(String),

    /// Process did not finish within the configured budget
    #[error("Timeout: probe did not finish within {0}s")]
    Timeout(u64),

    #[error("insufficient output elements: got {got}, need {need}")]
    InsufficientFields { got: usize, need: usize },

    #[error("invalid output element: {tag} not found in {field}")]
    TagMismatch { tag: String, field: String },

    #[error("invalid severity value: {0}")]
    InvalidSeverity(String),
}

/// Outcome of executing one probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Probe applied and produced a valid record
    Record(ResultRecord),
    /// Probe ran the protocol correctly but reported itself inapplicable
    NotApplicable,
    /// Probe failed to run or violated the output protocol
    Failed(ProbeFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    pub probe_path: PathBuf,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn record(probe_path: impl Into<PathBuf>, record: ResultRecord) -> Self {
        Self {
            probe_path: probe_path.into(),
            outcome: ProbeOutcome::Record(record),
        }
    }

    pub fn not_applicable(probe_path: impl Into<PathBuf>) -> Self {
        Self {
            probe_path: probe_path.into(),
            outcome: ProbeOutcome::NotApplicable,
        }
    }

    pub fn failed(probe_path: impl Into<PathBuf>, failure: ProbeFailure) -> Self {
        Self {
            probe_path: probe_path.into(),
            outcome: ProbeOutcome::Failed(failure),
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Record(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_codes_round_trip() {
        for severity in Severity::REPORT_ORDER {
            assert_eq!(Severity::from_code(severity.code()), Some(severity));
        }
    }

    #[test]
    fn reserved_code_maps_to_no_level() {
        assert_eq!(Severity::from_code(2), None);
    }

    #[test]
    fn out_of_window_codes_map_to_no_level() {
        assert_eq!(Severity::from_code(-1), None);
        assert_eq!(Severity::from_code(5), None);
        assert_eq!(Severity::from_code(7), None);
    }

    #[test]
    fn primary_link_resolves_by_key() {
        let record = ResultRecord {
            probe_path: PathBuf::from("/p"),
            class: "Network".into(),
            category: "General".into(),
            component: "eth0".into(),
            pattern_id: "1234".into(),
            primary_link_key: "META_LINK_TID".into(),
            severity: Severity::Critical,
            message: "Link down".into(),
            links: vec![Link {
                key: "META_LINK_TID".into(),
                label: "TID".into(),
                url: "http://example/1234".into(),
            }],
        };
        assert_eq!(record.primary_link().map(|l| l.url.as_str()), Some("http://example/1234"));
    }

    #[test]
    fn unresolved_primary_link_is_none() {
        let record = ResultRecord {
            probe_path: PathBuf::from("/p"),
            class: "Network".into(),
            category: "General".into(),
            component: "eth0".into(),
            pattern_id: "1234".into(),
            primary_link_key: "META_LINK_MISSING".into(),
            severity: Severity::Success,
            message: "ok".into(),
            links: vec![Link {
                key: "META_LINK_TID".into(),
                label: "TID".into(),
                url: "http://example/1234".into(),
            }],
        };
        assert!(record.primary_link().is_none());
    }
}
