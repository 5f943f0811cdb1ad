use std::collections::BTreeMap;

use clashguard_core::{FileRecord, PackageRef};
use serde::Serialize;

pub const CLEAR_MESSAGE: &str = "No collision detected, continuing";
pub const ABORT_MESSAGE: &str = "Collisions detected, aborting";

/// Orphans sort after every package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerKey {
    Package(PackageRef),
    Orphaned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipMap {
    groups: BTreeMap<OwnerKey, Vec<FileRecord>>,
}

impl OwnershipMap {
    pub fn insert(&mut self, owner: OwnerKey, record: FileRecord) {
        self.groups.entry(owner).or_default().push(record);
    }

    pub fn get(&self, owner: &OwnerKey) -> Option<&[FileRecord]> {
        self.groups.get(owner).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&OwnerKey, &[FileRecord])> {
        self.groups
            .iter()
            .map(|(owner, files)| (owner, files.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionReport {
    pub installing: PackageRef,
    pub owners: OwnershipMap,
}

impl CollisionReport {
    pub fn new(installing: PackageRef, owners: OwnershipMap) -> Self {
        Self { installing, owners }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["Detected collisions:".to_string()];
        for (owner, files) in self.owners.groups() {
            match owner {
                OwnerKey::Orphaned => lines.push(format!(
                    "  Orphaned files (attributed to {}):",
                    self.installing
                )),
                OwnerKey::Package(id) => lines.push(format!("  {id}:")),
            }
            lines.extend(files.iter().map(|file| format!("    {}", file.display_line())));
        }
        lines
    }

    pub fn groups(&self) -> Vec<ReportGroup> {
        self.owners
            .groups()
            .map(|(owner, files)| ReportGroup {
                owner: match owner {
                    OwnerKey::Package(id) => Some(id.clone()),
                    OwnerKey::Orphaned => None,
                },
                orphaned: matches!(owner, OwnerKey::Orphaned),
                files: files.to_vec(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub owner: Option<PackageRef>,
    pub orphaned: bool,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub exit_status: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<ReportGroup>,
}

impl Verdict {
    pub fn clear() -> Self {
        Self {
            exit_status: 0,
            message: CLEAR_MESSAGE.to_string(),
            collisions: Vec::new(),
        }
    }

    pub fn skipped(root: &str) -> Self {
        Self {
            exit_status: 0,
            message: format!(
                "${{COLLISION_IGNORE}} contains \"{root}\", skipping collision check"
            ),
            collisions: Vec::new(),
        }
    }

    pub fn collisions(report: &CollisionReport) -> Self {
        let mut lines = report.lines();
        lines.push(ABORT_MESSAGE.to_string());
        Self {
            exit_status: 1,
            message: lines.join("\n"),
            collisions: report.groups(),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            exit_status: 1,
            message: format!("Collision check failed: {reason}"),
            collisions: Vec::new(),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.exit_status == 0
    }
}
