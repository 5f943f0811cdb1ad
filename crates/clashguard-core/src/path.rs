use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileKind {
    Regular,
    Symlink { target: String },
}

/// One file as seen inside the target root, e.g. `/usr/bin/foo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(flatten)]
    pub kind: FileKind,
}

impl FileRecord {
    pub fn regular(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Regular,
        }
    }

    pub fn symlink(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Symlink {
                target: target.into(),
            },
        }
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, FileKind::Symlink { .. })
    }

    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            FileKind::Symlink { target } => Some(target),
            FileKind::Regular => None,
        }
    }

    pub fn canonical_path(&self) -> String {
        canonicalize_path(&self.path)
    }

    /// Same kind and, for symlinks, the same canonical target. Paths are
    /// compared separately by the caller.
    pub fn same_kind_as(&self, other: &FileRecord) -> bool {
        match (&self.kind, &other.kind) {
            (FileKind::Regular, FileKind::Regular) => true,
            (FileKind::Symlink { target: ours }, FileKind::Symlink { target: theirs }) => {
                canonicalize_path(ours) == canonicalize_path(theirs)
            }
            _ => false,
        }
    }

    pub fn display_line(&self) -> String {
        match &self.kind {
            FileKind::Regular => self.path.clone(),
            FileKind::Symlink { target } => format!("{} -> {}", self.path, target),
        }
    }
}

/// Collapses repeated separators, `.` segments and `..` segments without
/// touching the filesystem. Leading `..` segments of relative paths survive.
pub fn canonicalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

pub fn root_join(root: &Path, logical: &str) -> PathBuf {
    root.join(logical.trim_start_matches('/'))
}

/// Describes whatever currently sits at `logical` under `root` without
/// following a final symlink.
pub fn probe_record(root: &Path, logical: &str) -> io::Result<FileRecord> {
    let on_disk = root_join(root, logical);
    let metadata = fs::symlink_metadata(&on_disk)?;
    if metadata.file_type().is_symlink() {
        let target = fs::read_link(&on_disk)?;
        return Ok(FileRecord::symlink(
            logical,
            target.to_string_lossy().into_owned(),
        ));
    }
    Ok(FileRecord::regular(logical))
}
