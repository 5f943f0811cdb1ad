use std::fs;
use std::path::Path;

use clashguard_core::{FileRecord, ManifestError};

use crate::InstalledPackage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentsEntry {
    Regular { path: String },
    Directory { path: String },
    Symlink { path: String, target: String },
    Other { path: String },
}

impl ContentsEntry {
    pub fn path(&self) -> &str {
        match self {
            Self::Regular { path }
            | Self::Directory { path }
            | Self::Symlink { path, .. }
            | Self::Other { path } => path,
        }
    }

    pub fn into_record(self) -> Option<FileRecord> {
        match self {
            Self::Regular { path } => Some(FileRecord::regular(path)),
            Self::Symlink { path, target } => Some(FileRecord::symlink(path, target)),
            Self::Directory { .. } | Self::Other { .. } => None,
        }
    }
}

pub struct ManifestIndex;

impl ManifestIndex {
    /// Regular files and symlinks recorded for `package`, in manifest order.
    pub fn load(package: &InstalledPackage) -> Result<Vec<FileRecord>, ManifestError> {
        let Some(path) = package.dir.manifest_path() else {
            return Err(ManifestError::Missing {
                location: package.dir.path().to_path_buf(),
            });
        };
        let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;

        Ok(parse_contents(&raw, &path)?
            .into_iter()
            .filter_map(ContentsEntry::into_record)
            .collect())
    }
}

pub fn parse_contents(raw: &str, origin: &Path) -> Result<Vec<ContentsEntry>, ManifestError> {
    let mut entries = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: &str| ManifestError::Malformed {
            path: origin.to_path_buf(),
            line: idx + 1,
            reason: reason.to_string(),
        };

        let (kind, rest) = line.split_once(' ').unwrap_or((line, ""));
        let entry = match kind {
            "obj" => {
                let mut fields = rest.rsplitn(3, ' ');
                let (Some(_mtime), Some(_digest), Some(path)) =
                    (fields.next(), fields.next(), fields.next())
                else {
                    return Err(malformed("obj entry needs a path, digest and mtime"));
                };
                ContentsEntry::Regular {
                    path: path.to_string(),
                }
            }
            "sym" => {
                let Some((path, tail)) = rest.split_once(" -> ") else {
                    return Err(malformed("sym entry has no ' -> ' separator"));
                };
                let target = match tail.rsplit_once(' ') {
                    Some((target, mtime)) if mtime.bytes().all(|b| b.is_ascii_digit()) => target,
                    _ => tail,
                };
                ContentsEntry::Symlink {
                    path: path.to_string(),
                    target: target.to_string(),
                }
            }
            "dir" => ContentsEntry::Directory {
                path: rest.to_string(),
            },
            _ => ContentsEntry::Other {
                path: rest.to_string(),
            },
        };
        if entry.path().is_empty() {
            return Err(malformed("entry has no path"));
        }
        entries.push(entry);
    }
    Ok(entries)
}
