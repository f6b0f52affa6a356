pub mod aggregate;
pub mod html;
pub mod json;
pub mod terminal;

use crate::analysis::AnalysisOutcome;
use std::path::Path;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors that can occur during report generation
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

/// Trait for report generators that write to a file
pub trait ReportGenerator {
    /// Generate a report from an analysis outcome
    fn generate(&self, outcome: &AnalysisOutcome, output_path: &Path) -> ReportResult<()>;

    /// Get generator name
    fn name(&self) -> &'static str;
}
