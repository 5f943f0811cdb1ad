use std::fs;
use std::io;
use std::path::Path;

use clashguard_core::{canonicalize_path, CheckError, CheckResult, FileRecord, PathPolicy};

/// One file from the staging tree. Once cleared, an entry never collides again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub record: FileRecord,
    collides: bool,
}

impl StagedEntry {
    pub fn new(record: FileRecord, collides: bool) -> Self {
        Self { record, collides }
    }

    pub fn collides(&self) -> bool {
        self.collides
    }

    pub fn clear(&mut self) {
        self.collides = false;
    }
}

/// Lists every non-directory entry below `staging_root`, re-rooted from
/// `strip_prefix` onto `target_root`, sorted by path. An entry is a collision
/// candidate when it is not ignored and something already exists at its
/// location on the target root.
pub fn scan_staged_tree(
    staging_root: &Path,
    strip_prefix: &Path,
    policy: &PathPolicy<'_>,
    target_root: &Path,
) -> CheckResult<Vec<StagedEntry>> {
    let mut entries = Vec::new();
    scan_recursive(staging_root, strip_prefix, policy, target_root, &mut entries)?;
    entries.sort_by(|a, b| a.record.path.cmp(&b.record.path));
    Ok(entries)
}

fn scan_recursive(
    current: &Path,
    strip_prefix: &Path,
    policy: &PathPolicy<'_>,
    target_root: &Path,
    entries: &mut Vec<StagedEntry>,
) -> CheckResult<()> {
    for entry in fs::read_dir(current).map_err(|err| CheckError::io(current, err))? {
        let entry = entry.map_err(|err| CheckError::io(current, err))?;
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path).map_err(|err| CheckError::io(&path, err))?;

        if metadata.is_dir() {
            scan_recursive(&path, strip_prefix, policy, target_root, entries)?;
            continue;
        }

        let rel = path.strip_prefix(strip_prefix).map_err(|_| {
            CheckError::io(
                &path,
                io::Error::new(io::ErrorKind::InvalidInput, "entry is outside the strip prefix"),
            )
        })?;
        let logical = canonicalize_path(&format!("/{}", rel.to_string_lossy()));

        let record = if metadata.file_type().is_symlink() {
            let target = fs::read_link(&path).map_err(|err| CheckError::io(&path, err))?;
            FileRecord::symlink(&logical, target.to_string_lossy().into_owned())
        } else {
            FileRecord::regular(&logical)
        };

        // Probe with the raw name; the logical string is lossy for non-UTF-8 names.
        let collides = !policy.is_ignored(&logical)
            && fs::symlink_metadata(target_root.join(rel)).is_ok();
        entries.push(StagedEntry::new(record, collides));
    }
    Ok(())
}
