use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::snapshot::{Fingerprint, ProductIdentity};

/// Catalog subdirectory of site-local patterns, always included
pub const LOCAL_DIR: &str = "local";

/// Subdirectory name reserved for pattern helper libraries, never executed
const LIB_DIR: &str = "lib";

/// Error type for catalog resolution
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("pattern catalog not found: {0}")]
    MissingRoot(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// One file discovered in the rule catalog: its path plus the category
/// segments between the catalog root and the file, kept for report links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub segments: Vec<String>,
}

impl CatalogEntry {
    /// Human-readable source location, e.g. `SLE/sle15all`
    pub fn source_location(&self) -> String {
        self.segments.join("/")
    }

    /// Marker files document a directory and are never executed.
    pub fn is_skip_marker(&self) -> bool {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == "README" || n.starts_with("README."))
    }
}

/// Result of resolving a fingerprint against the catalog
#[derive(Debug, Clone)]
pub struct ResolvedPatterns {
    /// Every file under the included directories, input-enumeration order
    pub entries: Vec<CatalogEntry>,
    /// Trailing directory names of the included directories, sorted
    /// case-insensitively for deterministic status output
    pub filter_labels: Vec<String>,
}

impl ResolvedPatterns {
    /// Paths of the probes to execute, skip markers excluded
    pub fn probe_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_skip_marker())
            .map(|entry| entry.path.clone())
            .collect()
    }
}

/// The filesystem hierarchy of probes organized by product and version.
pub struct PatternCatalog {
    root: PathBuf,
}

impl PatternCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a fingerprint to the applicable probe set.
    ///
    /// Each product contributes a version-family directory
    /// (`<tag><major>all/`) and a version-exact one (`<tag><major>sp<minor>/`)
    /// under its pattern subdirectory; only directories that exist on disk
    /// are included, each at most once.
    pub fn resolve(&self, fingerprint: &Fingerprint) -> Result<ResolvedPatterns, CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::MissingRoot(self.root.clone()));
        }

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut included: Vec<PathBuf> = Vec::new();
        let mut include = |dir: PathBuf| {
            if dir.is_dir() && seen.insert(dir.clone()) {
                included.push(dir);
            }
        };

        include(self.root.join(LOCAL_DIR));
        for product in &fingerprint.products {
            include(candidate_dir(&self.root, product, true));
            include(candidate_dir(&self.root, product, false));
        }

        let mut filter_labels: Vec<String> = included
            .iter()
            .filter_map(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        filter_labels.sort_by_key(|label| label.to_lowercase());

        let mut entries = Vec::new();
        for dir in &included {
            entries.extend(self.list_entries(dir)?);
        }

        info!(
            "Resolved {} catalog entries from {} directories",
            entries.len(),
            included.len()
        );
        Ok(ResolvedPatterns {
            entries,
            filter_labels,
        })
    }

    /// Recursively list the files of one included directory, in a stable
    /// name order. Helper-library subdirectories are not probes.
    fn list_entries(&self, dir: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && e.file_name().to_str() == Some(LIB_DIR))
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();
            let segments = path
                .parent()
                .and_then(|parent| parent.strip_prefix(&self.root).ok())
                .map(|rel| {
                    rel.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();
            debug!("Catalog entry: {}", path.display());
            entries.push(CatalogEntry { path, segments });
        }
        Ok(entries)
    }
}

/// Candidate directory of one product: the version-family form
/// (`<tag><major>all`) or the version-exact form (`<tag><major>sp<minor>`).
pub fn candidate_dir(root: &Path, product: &ProductIdentity, family: bool) -> PathBuf {
    let leaf = if family {
        format!("{}{}all", product.tag, product.major_version)
    } else {
        format!(
            "{}{}sp{}",
            product.tag, product.major_version, product.minor_version
        )
    };
    root.join(&product.pattern_tag).join(leaf)
}
