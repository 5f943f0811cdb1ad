use std::collections::HashMap;
use std::path::Path;

use clashguard_core::{canonicalize_path, probe_record, FileRecord, PackageRef};
use clashguard_installed::{InstalledIndex, InstalledPackage};

use crate::report::{OwnerKey, OwnershipMap};
use crate::StagedEntry;

/// First installed package, in index order, whose manifest lists `path`.
pub fn resolve_owner(path: &str, index: &InstalledIndex) -> Option<PackageRef> {
    let wanted = canonicalize_path(path);
    index
        .packages()
        .find(|package| {
            readable_manifest(package)
                .is_some_and(|records| records.iter().any(|r| r.canonical_path() == wanted))
        })
        .map(|package| package.id.clone())
}

/// Groups every still-colliding staged entry under its owner. Each path gets
/// the same owner [`resolve_owner`] would report, but the index is walked only
/// once for all paths. Paths nobody owns land in the orphan group, described
/// by whatever currently sits on the target root.
pub fn attribute_owners(
    staged: &[StagedEntry],
    index: &InstalledIndex,
    target_root: &Path,
) -> OwnershipMap {
    let pending: Vec<(String, &StagedEntry)> = staged
        .iter()
        .filter(|entry| entry.collides())
        .map(|entry| (entry.record.canonical_path(), entry))
        .collect();
    let mut owners: Vec<Option<(PackageRef, FileRecord)>> = vec![None; pending.len()];
    let mut remaining = pending.len();

    for package in index.packages() {
        if remaining == 0 {
            break;
        }
        let Some(records) = readable_manifest(package) else {
            continue;
        };
        let mut by_path: HashMap<String, &FileRecord> = HashMap::with_capacity(records.len());
        for record in &records {
            by_path.entry(record.canonical_path()).or_insert(record);
        }

        for (slot, (wanted, _)) in owners.iter_mut().zip(&pending) {
            if slot.is_some() {
                continue;
            }
            if let Some(record) = by_path.get(wanted) {
                *slot = Some((package.id.clone(), (*record).clone()));
                remaining -= 1;
            }
        }
    }

    let mut map = OwnershipMap::default();
    for (owner, (_, entry)) in owners.into_iter().zip(pending) {
        match owner {
            Some((id, record)) => map.insert(OwnerKey::Package(id), record),
            None => {
                let record = probe_record(target_root, &entry.record.path)
                    .unwrap_or_else(|_| entry.record.clone());
                map.insert(OwnerKey::Orphaned, record);
            }
        }
    }
    map
}

fn readable_manifest(package: &InstalledPackage) -> Option<Vec<FileRecord>> {
    match package.load_manifest() {
        Ok(records) => Some(records),
        Err(err) => {
            tracing::debug!(
                target: "clashguard.check.owners",
                package = %package.id,
                error = %err,
                "skipping package without readable manifest"
            );
            None
        }
    }
}
