mod contents;
mod index;
mod layout;
mod replaced;

pub use contents::{parse_contents, ContentsEntry, ManifestIndex};
pub use index::{
    InstalledCategory, InstalledIndex, InstalledPackage, InstalledPackageName, InstalledRepository,
};
pub use layout::{
    default_repositories, destination_repository, PackageDir, RepositoryConfig, INSTALLED_REPO,
    UNPACKAGED_REPO,
};
pub use replaced::{resolve_replaced_version, ReplacedVersion};
