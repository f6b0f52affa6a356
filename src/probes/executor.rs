use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::parser::{parse_output, ParsedOutput};
use super::{ProbeFailure, ProbeResult};

/// Flag passed to every probe in front of the snapshot directory
pub const SNAPSHOT_PATH_FLAG: &str = "-p";

/// Default per-probe execution budget
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs probes as isolated child processes against a snapshot directory.
///
/// Every per-probe failure is captured in-band as a `ProbeResult`; a
/// misbehaving probe never aborts the batch. Results are reported in input
/// order regardless of completion order.
pub struct ProbeExecutor {
    snapshot_dir: PathBuf,
    jobs: usize,
    probe_timeout: Duration,
    progress: Option<ProgressBar>,
}

impl ProbeExecutor {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            jobs: 1,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            progress: None,
        }
    }

    /// Maximum number of probes running at once. Probes run sequentially by
    /// default; they are independent and read-only against the snapshot, so
    /// higher values only change wall-clock time, not results.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
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

    /// Execute all probes and collect one result per probe, in input order.
    pub async fn run_all(&self, probes: &[PathBuf]) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut handles = Vec::with_capacity(probes.len());

        for probe in probes {
            let semaphore = semaphore.clone();
            let probe = probe.clone();
            let snapshot_dir = self.snapshot_dir.clone();
            let timeout = self.probe_timeout;
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProbeResult::failed(
                            probe,
                            ProbeFailure::Runtime("executor shut down".to_string()),
                        )
                    }
                };
                let result = run_probe(&probe, &snapshot_dir, timeout).await;
                if let Some(bar) = &progress {
                    bar.inc(1);
                }
                result
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (handle, probe) in handles.into_iter().zip(probes) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    // a panicking probe task is still just one failed probe
                    warn!("Probe task for {} aborted: {}", probe.display(), e);
                    results.push(ProbeResult::failed(
                        probe.clone(),
                        ProbeFailure::Runtime(format!("probe task aborted: {e}")),
                    ));
                }
            }
        }
        results
    }
}

async fn run_probe(probe: &Path, snapshot_dir: &Path, timeout: Duration) -> ProbeResult {
    debug!("Running probe {}", probe.display());

    let mut command = Command::new(probe);
    command
        .arg(SNAPSHOT_PATH_FLAG)
        .arg(snapshot_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            warn!("Probe {} timed out after {:?}", probe.display(), timeout);
            return ProbeResult::failed(probe.to_path_buf(), ProbeFailure::Timeout(timeout.as_secs()));
        }
        Ok(Err(e)) => {
            warn!("Probe {} failed to run: {}", probe.display(), e);
            return ProbeResult::failed(probe.to_path_buf(), ProbeFailure::Runtime(e.to_string()));
        }
        Ok(Ok(output)) => output,
    };

    if !output.stderr.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let first_line = stderr.lines().next().unwrap_or("").trim_end().to_string();
        warn!("Probe {} wrote to stderr: {}", probe.display(), first_line);
        return ProbeResult::failed(probe.to_path_buf(), ProbeFailure::Output(first_line));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match parse_output(&stdout, probe) {
        Ok(ParsedOutput::Record(record)) => ProbeResult::record(probe.to_path_buf(), record),
        Ok(ParsedOutput::NotApplicable) => ProbeResult::not_applicable(probe.to_path_buf()),
        Err(failure) => ProbeResult::failed(probe.to_path_buf(), failure),
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::probes::ProbeOutcome;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_probe(dir: &Path, name: &str, script: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const OK_PROBE: &str = "#!/bin/sh\n\
        echo \"CLASS=Network|CATEGORY=General|COMPONENT=eth0|PATTERN_ID=1234|PRIMARY_LINK=META_LINK_TID|OVERALL=4|OVERALL_INFO=Link down|META_LINK_TID=http://example/1234\"\n";

    const STDERR_PROBE: &str = "#!/bin/sh\necho 'error: missing dependency' >&2\n";

    const NOT_APPLICABLE_PROBE: &str = "#!/bin/sh\n\
        echo \"CLASS=Network|CATEGORY=General|COMPONENT=eth0|PATTERN_ID=1234|PRIMARY_LINK=META_LINK_TID|OVERALL=7|OVERALL_INFO=n/a|META_LINK_TID=http://example/1234\"\n";

    #[tokio::test]
    async fn valid_probe_produces_record() {
        let dir = TempDir::new().unwrap();
        let probe = write_probe(dir.path(), "ok", OK_PROBE);
        let results = ProbeExecutor::new(dir.path()).run_all(&[probe.clone()]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].probe_path, probe);
        let ProbeOutcome::Record(record) = &results[0].outcome else {
            panic!("expected record, got {:?}", results[0].outcome);
        };
        assert_eq!(record.message, "Link down");
    }

    #[tokio::test]
    async fn stderr_probe_is_an_output_error() {
        let dir = TempDir::new().unwrap();
        let probe = write_probe(dir.path(), "noisy", STDERR_PROBE);
        let results = ProbeExecutor::new(dir.path()).run_all(&[probe]).await;
        let ProbeOutcome::Failed(failure) = &results[0].outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.to_string(), "Output error: error: missing dependency");
    }

    #[tokio::test]
    async fn missing_probe_is_a_runtime_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let results = ProbeExecutor::new(dir.path()).run_all(&[missing]).await;
        assert!(matches!(
            results[0].outcome,
            ProbeOutcome::Failed(ProbeFailure::Runtime(_))
        ));
    }

    #[tokio::test]
    async fn inapplicable_probe_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let probe = write_probe(dir.path(), "na", NOT_APPLICABLE_PROBE);
        let results = ProbeExecutor::new(dir.path()).run_all(&[probe]).await;
        assert_eq!(results[0].outcome, ProbeOutcome::NotApplicable);
    }

    #[tokio::test]
    async fn hung_probe_hits_the_timeout() {
        let dir = TempDir::new().unwrap();
        let probe = write_probe(dir.path(), "hang", "#!/bin/sh\nsleep 30\n");
        let results = ProbeExecutor::new(dir.path())
            .with_probe_timeout(Duration::from_millis(200))
            .run_all(&[probe])
            .await;
        assert!(matches!(
            results[0].outcome,
            ProbeOutcome::Failed(ProbeFailure::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn one_bad_probe_never_aborts_the_batch() {
        let dir = TempDir::new().unwrap();
        let ok = write_probe(dir.path(), "ok", OK_PROBE);
        let noisy = write_probe(dir.path(), "noisy", STDERR_PROBE);
        let missing = dir.path().join("missing");
        let na = write_probe(dir.path(), "na", NOT_APPLICABLE_PROBE);

        let probes = vec![noisy.clone(), ok.clone(), missing.clone(), na.clone()];
        let results = ProbeExecutor::new(dir.path()).run_all(&probes).await;

        assert_eq!(results.len(), 4);
        // input order is preserved
        let paths: Vec<_> = results.iter().map(|r| r.probe_path.clone()).collect();
        assert_eq!(paths, probes);
        assert!(results[0].is_failed());
        assert!(results[1].is_record());
        assert!(results[2].is_failed());
        assert_eq!(results[3].outcome, ProbeOutcome::NotApplicable);
    }

    #[tokio::test]
    async fn concurrent_runs_keep_input_order() {
        let dir = TempDir::new().unwrap();
        let mut probes = Vec::new();
        for i in 0..8 {
            // stagger runtimes so completion order differs from input order
            let delay = if i % 2 == 0 { "0.05" } else { "0" };
            let script = format!(
                "#!/bin/sh\nsleep {delay}\n\
                 echo \"CLASS=C{i}|CATEGORY=General|COMPONENT=c|PATTERN_ID={i}|PRIMARY_LINK=META_LINK_TID|OVERALL=0|OVERALL_INFO=ok|META_LINK_TID=http://example/{i}\"\n"
            );
            probes.push(write_probe(dir.path(), &format!("p{i}"), &script));
        }
        let results = ProbeExecutor::new(dir.path())
            .with_jobs(4)
            .run_all(&probes)
            .await;
        let paths: Vec<_> = results.iter().map(|r| r.probe_path.clone()).collect();
        assert_eq!(paths, probes);
        assert!(results.iter().all(|r| r.is_record()));
    }
}
