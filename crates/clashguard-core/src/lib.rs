mod error;
mod package;
mod path;
mod policy;
mod version;

pub use error::{CheckError, CheckResult, ManifestError, VersionError};
pub use package::PackageRef;
pub use path::{canonicalize_path, probe_record, root_join, FileKind, FileRecord};
pub use policy::{IgnoreSet, IgnoreSetBuilder, PathPolicy, FIXED_INFO_INDEX};
pub use version::{split_name_version, PackageVersion};
