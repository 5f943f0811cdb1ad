mod compare;
mod owners;
mod pipeline;
mod report;
mod scan;

pub use compare::{compare_with_previous, TargetRoot};
pub use owners::{attribute_owners, resolve_owner};
pub use pipeline::{
    ignore_covers_root, CheckObserver, CheckPhase, CheckRequest, CollisionCheck, NoopObserver,
    DEFAULT_PROGRESS_INTERVAL,
};
pub use report::{CollisionReport, OwnerKey, OwnershipMap, ReportGroup, Verdict};
pub use scan::{scan_staged_tree, StagedEntry};
