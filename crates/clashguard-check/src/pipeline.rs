use std::path::PathBuf;

use clashguard_core::{CheckResult, FileRecord, IgnoreSet, PackageRef, PackageVersion, PathPolicy};
use clashguard_installed::{resolve_replaced_version, InstalledIndex};

use crate::report::{CollisionReport, Verdict};
use crate::{attribute_owners, compare_with_previous, scan_staged_tree, TargetRoot};

pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPhase {
    Idle,
    Scanning,
    Comparing,
    Clear,
    ResolvingOwnership,
    Reported,
}

impl CheckPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Clear | Self::Reported)
    }
}

/// Hooks for rendering a running check. Every method defaults to doing nothing.
pub trait CheckObserver {
    fn phase(&mut self, _phase: CheckPhase) {}

    fn scanned(&mut self, _staged: usize, _candidates: usize) {}

    fn replaced_version(&mut self, _package: Option<&PackageRef>) {}

    fn compare_progress(&mut self, _done: usize, _total: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CheckObserver for NoopObserver {}

/// The package being merged and where its files come from and go to.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub category: String,
    pub name: String,
    pub version: PackageVersion,
    pub slot: String,
    pub image: PathBuf,
    pub root: PathBuf,
    pub destination_repo: String,
}

impl CheckRequest {
    pub fn installing(&self) -> PackageRef {
        PackageRef::new(
            &self.category,
            &self.name,
            self.version.clone(),
            &self.slot,
            &self.destination_repo,
        )
    }
}

/// True when a word of `COLLISION_IGNORE` names the whole target root.
pub fn ignore_covers_root(collision_ignore: &str, root: &str) -> bool {
    collision_ignore.split_whitespace().any(|word| word == root)
}

pub struct CollisionCheck<'a> {
    request: &'a CheckRequest,
    ignore: &'a IgnoreSet,
    index: &'a InstalledIndex,
    progress_interval: usize,
}

impl<'a> CollisionCheck<'a> {
    pub fn new(request: &'a CheckRequest, ignore: &'a IgnoreSet, index: &'a InstalledIndex) -> Self {
        Self {
            request,
            ignore,
            index,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn run(&self, observer: &mut dyn CheckObserver) -> CheckResult<Verdict> {
        let request = self.request;
        let policy = PathPolicy::new(self.ignore);

        observer.phase(CheckPhase::Scanning);
        let mut staged = scan_staged_tree(&request.image, &request.image, &policy, &request.root)?;
        let candidates = staged.iter().filter(|entry| entry.collides()).count();
        observer.scanned(staged.len(), candidates);
        tracing::debug!(
            target: "clashguard.check",
            staged = staged.len(),
            candidates,
            "staging tree scanned"
        );

        let replaced = resolve_replaced_version(
            self.index,
            &request.destination_repo,
            &request.category,
            &request.name,
            &request.slot,
            &request.version,
        );
        observer.replaced_version(replaced.as_ref().map(|found| &found.package.id));
        let previous: Vec<FileRecord> = match replaced {
            Some(found) => found.records,
            None => {
                tracing::debug!(
                    target: "clashguard.check",
                    package = %request.installing(),
                    "no readable replaced version, assuming no prior ownership"
                );
                Vec::new()
            }
        };

        observer.phase(CheckPhase::Comparing);
        let target_root = TargetRoot::new(&request.root);
        let clear = compare_with_previous(
            &mut staged,
            &previous,
            &target_root,
            self.progress_interval,
            &mut |done, total| observer.compare_progress(done, total),
        );
        if clear {
            observer.phase(CheckPhase::Clear);
            return Ok(Verdict::clear());
        }

        observer.phase(CheckPhase::ResolvingOwnership);
        let owners = attribute_owners(&staged, self.index, &request.root);
        let report = CollisionReport::new(request.installing(), owners);
        tracing::debug!(
            target: "clashguard.check",
            files = report.owners.file_count(),
            "collisions attributed"
        );
        observer.phase(CheckPhase::Reported);
        Ok(Verdict::collisions(&report))
    }
}
