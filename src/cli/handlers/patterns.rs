use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::catalog::PatternCatalog;
use crate::cli::commands::PatternsCommand;
use crate::snapshot::fingerprint::fingerprint;
use crate::snapshot::Snapshot;

pub async fn handle_patterns_command(action: PatternsCommand) -> Result<()> {
    match action {
        PatternsCommand::List {
            snapshot,
            patterns_dir,
            detailed,
        } => {
            let snapshot = Snapshot::open(&snapshot)
                .with_context(|| format!("Invalid supportconfig: {}", snapshot.display()))?;
            let (fingerprint, _profile) = fingerprint(&snapshot)?;
            let resolved = PatternCatalog::new(&patterns_dir).resolve(&fingerprint)?;

            println!("\nSystem definition: {}", fingerprint.describe());
            println!("Pattern filter:    {}", resolved.filter_labels.join(" "));
            println!();

            let mut per_location: BTreeMap<String, usize> = BTreeMap::new();
            for entry in &resolved.entries {
                *per_location.entry(entry.source_location()).or_default() += 1;
            }
            for (location, count) in &per_location {
                println!(
                    "  {location}: {count} entr{}",
                    if *count == 1 { "y" } else { "ies" }
                );
            }
            println!(
                "\n{} catalog entries, {} executable probes",
                resolved.entries.len(),
                resolved.probe_paths().len()
            );

            if detailed {
                println!();
                for entry in &resolved.entries {
                    let marker = if entry.is_skip_marker() { " (skipped)" } else { "" };
                    println!("  {}{marker}", entry.path.display());
                }
            }
        }
    }
    Ok(())
}
