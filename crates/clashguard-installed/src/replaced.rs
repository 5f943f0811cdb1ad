use clashguard_core::{FileRecord, PackageVersion};

use crate::{InstalledIndex, InstalledPackage};

/// The installed version a merge supersedes, with the manifest records that
/// were read while choosing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacedVersion<'a> {
    pub package: &'a InstalledPackage,
    pub records: Vec<FileRecord>,
}

/// Picks the installed version of `category/name` in `slot` that the merge of
/// `current` supersedes.
///
/// Candidates whose manifest cannot be loaded are dropped before any version
/// comparison. A single same-slot candidate is used even when it carries the
/// version being merged (a reinstall); otherwise candidates equal to `current`
/// are skipped. The greatest remaining version wins.
pub fn resolve_replaced_version<'a>(
    index: &'a InstalledIndex,
    repository: &str,
    category: &str,
    name: &str,
    slot: &str,
    current: &PackageVersion,
) -> Option<ReplacedVersion<'a>> {
    let mut candidates: Vec<&InstalledPackage> = index
        .versions_of(repository, category, name)
        .iter()
        .filter(|package| package.id.slot == slot)
        .collect();
    let single = candidates.len() == 1;
    candidates.retain(|package| single || package.id.version != *current);
    candidates.sort_by(|a, b| b.id.version.cmp(&a.id.version));

    candidates.into_iter().find_map(|package| match package.load_manifest() {
        Ok(records) => Some(ReplacedVersion { package, records }),
        Err(err) => {
            tracing::debug!(
                target: "clashguard.installed",
                package = %package.id,
                error = %err,
                "skipping replacement candidate with unreadable manifest"
            );
            None
        }
    })
}
