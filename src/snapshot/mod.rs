pub mod archive;
pub mod fingerprint;

use std::path::{Path, PathBuf};

pub use fingerprint::{Fingerprint, ProductIdentity, SystemProfile};

/// Environment-description file every supportconfig must contain
pub const ENVIRONMENT_FILE: &str = "basic-environment.txt";

/// Package-inventory file every supportconfig must contain
pub const PACKAGE_INVENTORY_FILE: &str = "rpm.txt";

/// Error type for snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("missing snapshot file: {0}")]
    MissingFile(PathBuf),

    #[error("not a snapshot directory: {0}")]
    NotADirectory(PathBuf),

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("empty archive: {0}")]
    EmptyArchive(PathBuf),

    #[error("checksum mismatch for {path}: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        computed: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// An extracted supportconfig directory, validated to hold the files the
/// analysis precondition requires.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
}

impl Snapshot {
    /// Open an extracted snapshot directory. Fails when the directory or
    /// either mandatory file is absent; no probe runs in that case.
    pub fn open(dir: impl Into<PathBuf>) -> SnapshotResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SnapshotError::NotADirectory(dir));
        }
        for required in [ENVIRONMENT_FILE, PACKAGE_INVENTORY_FILE] {
            let path = dir.join(required);
            if !path.is_file() {
                return Err(SnapshotError::MissingFile(path));
            }
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn environment_file(&self) -> PathBuf {
        self.dir.join(ENVIRONMENT_FILE)
    }

    pub fn package_inventory_file(&self) -> PathBuf {
        self.dir.join(PACKAGE_INVENTORY_FILE)
    }

    /// Name of the snapshot directory, used for report file naming
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "supportconfig".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn open_requires_both_mandatory_files() {
        let dir = TempDir::new().unwrap();
        let err = Snapshot::open(dir.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingFile(p) if p.ends_with(ENVIRONMENT_FILE)));

        fs::write(dir.path().join(ENVIRONMENT_FILE), "").unwrap();
        let err = Snapshot::open(dir.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingFile(p) if p.ends_with(PACKAGE_INVENTORY_FILE)));

        fs::write(dir.path().join(PACKAGE_INVENTORY_FILE), "").unwrap();
        assert!(Snapshot::open(dir.path()).is_ok());
    }

    #[test]
    fn open_rejects_a_plain_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("archive.txz");
        fs::write(&file, "not a directory").unwrap();
        assert!(matches!(
            Snapshot::open(&file).unwrap_err(),
            SnapshotError::NotADirectory(_)
        ));
    }
}
