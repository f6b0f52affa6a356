use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{SnapshotError, SnapshotResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BZIP2_MAGIC: [u8; 3] = *b"BZh";
const XZ_MAGIC: [u8; 6] = [0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Offset of the `ustar` marker inside a tar header block
const TAR_MAGIC_OFFSET: usize = 257;

/// Extract a supportconfig archive into `dest_dir` and return the path of
/// the extracted snapshot directory. A `.md5` companion file next to the
/// archive is verified first when present.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> SnapshotResult<PathBuf> {
    verify_companion_checksum(archive_path)?;

    let root = archive_root(archive_path)?;
    info!(
        "Extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );
    let mut archive = tar::Archive::new(open_reader(archive_path)?);
    archive.unpack(dest_dir)?;
    Ok(dest_dir.join(root))
}

/// Open an archive behind the decompressor its magic bytes call for.
fn open_reader(path: &Path) -> SnapshotResult<Box<dyn Read>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 6];
    let read = file.read(&mut magic)?;

    let file = File::open(path)?;
    if read >= GZIP_MAGIC.len() && magic[..2] == GZIP_MAGIC {
        Ok(Box::new(flate2::read::GzDecoder::new(file)))
    } else if read >= BZIP2_MAGIC.len() && magic[..3] == BZIP2_MAGIC {
        Ok(Box::new(bzip2::read::BzDecoder::new(file)))
    } else if read >= XZ_MAGIC.len() && magic == XZ_MAGIC {
        Ok(Box::new(xz2::read::XzDecoder::new(file)))
    } else if is_plain_tar(path)? {
        Ok(Box::new(file))
    } else {
        Err(SnapshotError::UnsupportedFormat(path.to_path_buf()))
    }
}

fn is_plain_tar(path: &Path) -> SnapshotResult<bool> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 512];
    match file.read_exact(&mut header) {
        Ok(()) => Ok(header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == *b"ustar"),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// First path component of the archive's entries: supportconfig tarballs
/// wrap everything in a single top-level directory.
fn archive_root(path: &Path) -> SnapshotResult<PathBuf> {
    let mut archive = tar::Archive::new(open_reader(path)?);
    for entry in archive.entries()? {
        let entry = entry?;
        let entry_path = entry.path()?;
        if let Some(first) = entry_path.components().next() {
            return Ok(PathBuf::from(first.as_os_str()));
        }
    }
    Err(SnapshotError::EmptyArchive(path.to_path_buf()))
}

/// Compare the archive against its `.md5` companion, if one was shipped.
fn verify_companion_checksum(path: &Path) -> SnapshotResult<()> {
    let companion = PathBuf::from(format!("{}.md5", path.display()));
    if !companion.is_file() {
        return Ok(());
    }
    let text = fs::read_to_string(&companion)?;
    let Some(expected) = text.split_whitespace().next() else {
        return Ok(());
    };
    let computed = format!("{:x}", md5::compute(fs::read(path)?));
    if !expected.eq_ignore_ascii_case(&computed) {
        return Err(SnapshotError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            computed,
        });
    }
    debug!("Checksum verified for {}", path.display());
    Ok(())
}
