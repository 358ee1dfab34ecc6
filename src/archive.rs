//! Streaming tar extraction with member path validation.
//!
//! Members are read one header at a time. The first member whose path is
//! absolute or climbs out of the destination with `..` aborts the whole
//! extraction; nothing after it is written. Links and special files are
//! refused the same way.

use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Component, Path, PathBuf};

use flate2::bufread::GzDecoder;
use tar::{Archive, EntryType};
use tracing::{debug, info, instrument};

use crate::error::{HwrError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Counts of what an extraction wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Check an archive member path and return it normalized (no `.` segments).
///
/// Rejects paths starting with a separator, paths with a drive or root
/// component, and paths with any `..` segment. Both `/` and `\` count as
/// separators so archives built on Windows cannot smuggle `..\` through.
pub fn validate_member_path(raw: &Path) -> Result<PathBuf> {
    let text = raw.to_string_lossy();
    let unsafe_member = || HwrError::UnsafeArchiveMember {
        path: text.to_string(),
    };

    if text.starts_with('/') || text.starts_with('\\') {
        return Err(unsafe_member());
    }
    if text.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(unsafe_member());
    }

    let mut normalized = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_member())
            }
        }
    }
    Ok(normalized)
}

/// Extract a plain tar stream into `dest`.
#[instrument(skip(reader, dest), fields(dest = %dest.display()))]
pub fn extract_archive<R: Read>(reader: R, dest: &Path) -> Result<ExtractSummary> {
    let mut archive = Archive::new(reader);
    let mut summary = ExtractSummary::default();

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let kind = entry.header().entry_type();
        if is_metadata(kind) {
            continue;
        }

        let raw_path = entry.path().map_err(archive_error)?.into_owned();
        let relative = validate_member_path(&raw_path)?;

        if kind.is_dir() {
            if relative.as_os_str().is_empty() {
                continue;
            }
            fs::create_dir_all(dest.join(&relative))?;
            summary.directories += 1;
        } else if kind.is_file() {
            if relative.as_os_str().is_empty() {
                return Err(HwrError::Archive(format!(
                    "file member with empty path: {}",
                    raw_path.display()
                )));
            }
            let target = dest.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&target)?;
            let written = io::copy(&mut entry, &mut out)?;
            summary.files += 1;
            summary.bytes += written;
            debug!(path = %relative.display(), bytes = written, "extracted member");
        } else {
            return Err(HwrError::UnsupportedArchiveMember {
                path: raw_path.display().to_string(),
                kind: format!("{kind:?}"),
            });
        }

        crate::metrics::ARCHIVE_MEMBERS_TOTAL.inc();
    }

    info!(
        files = summary.files,
        directories = summary.directories,
        bytes = summary.bytes,
        "archive extracted"
    );
    Ok(summary)
}

/// Extract a tar or tar.gz stream, detecting gzip by its magic bytes.
pub fn extract_stream<R: BufRead>(mut reader: R, dest: &Path) -> Result<ExtractSummary> {
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if gzipped {
        debug!("gzip-compressed archive detected");
        extract_archive(GzDecoder::new(reader), dest)
    } else {
        extract_archive(reader, dest)
    }
}

fn is_metadata(kind: EntryType) -> bool {
    kind.is_pax_global_extensions()
        || kind.is_pax_local_extensions()
        || kind.is_gnu_longname()
        || kind.is_gnu_longlink()
}

fn archive_error(e: io::Error) -> HwrError {
    HwrError::Archive(e.to_string())
}
