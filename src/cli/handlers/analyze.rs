use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::analysis::AnalysisRun;
use crate::cli::commands::ReportFormat;
use crate::report::html::HtmlReporter;
use crate::report::json::JsonReporter;
use crate::report::terminal::TerminalReporter;
use crate::snapshot::{archive, Snapshot};

#[allow(clippy::too_many_arguments)]
pub async fn handle_analyze_command(
    snapshot_path: PathBuf,
    report: ReportFormat,
    output: Option<PathBuf>,
    patterns_dir: PathBuf,
    jobs: usize,
    probe_timeout: u64,
    keep_extracted: bool,
    verbose: bool,
) -> Result<()> {
    info!("Starting analysis of {}", snapshot_path.display());

    // An archive is extracted next to itself, like the collector leaves it
    let (snapshot_dir, extracted) = if snapshot_path.is_file() {
        let dest = snapshot_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let dir = archive::extract(&snapshot_path, &dest)
            .with_context(|| format!("Failed to extract {}", snapshot_path.display()))?;
        info!("Extracted to {}", dir.display());
        (dir, true)
    } else {
        (snapshot_path.clone(), false)
    };

    let snapshot = Snapshot::open(&snapshot_dir)
        .with_context(|| format!("Invalid supportconfig: {}", snapshot_dir.display()))?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} probes")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let outcome = AnalysisRun::new(snapshot, &patterns_dir)
        .with_jobs(jobs)
        .with_probe_timeout(Duration::from_secs(probe_timeout))
        .with_progress(progress.clone())
        .execute()
        .await?;
    progress.finish_and_clear();

    match report {
        ReportFormat::Terminal => {
            TerminalReporter::new().with_verbose(verbose).print(&outcome)?;
        }
        ReportFormat::Json => {
            let json = JsonReporter::new().render(&outcome)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    info!("Report saved to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        ReportFormat::Html => {
            let output_path = output.unwrap_or_else(|| {
                let name = format!("{}.html", outcome.snapshot_name);
                outcome
                    .snapshot_dir
                    .parent()
                    .map(|parent| parent.join(&name))
                    .unwrap_or_else(|| PathBuf::from(name))
            });
            HtmlReporter::new().save_report(&outcome, &output_path)?;
            info!("Report saved to {}", output_path.display());
        }
    }

    // only remove what this run created
    if extracted && !keep_extracted {
        fs::remove_dir_all(&snapshot_dir)
            .with_context(|| format!("Failed to clean up {}", snapshot_dir.display()))?;
    }

    Ok(())
}
