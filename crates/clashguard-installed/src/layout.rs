use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const INSTALLED_REPO: &str = "installed";
pub const UNPACKAGED_REPO: &str = "installed-unpackaged";

const MANIFEST_FILE_NAMES: [&str; 2] = ["CONTENTS", "contents"];
const SLOT_FILE_NAMES: [&str; 2] = ["SLOT", "slot"];
const DEFAULT_SLOT: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub location: PathBuf,
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.location.join(category)
    }

    pub fn package_dir(&self, category: &str, name: &str, version: &str) -> PathBuf {
        self.category_dir(category).join(format!("{name}-{version}"))
    }
}

pub fn default_repositories(root: &Path) -> Vec<RepositoryConfig> {
    vec![
        RepositoryConfig::new(INSTALLED_REPO, root.join("var/db/pkg")),
        RepositoryConfig::new(
            UNPACKAGED_REPO,
            root.join("var/db/paludis/repositories/installed-unpackaged"),
        ),
    ]
}

/// The repository a merge lands in: imports from the unpackaged client go to
/// the unpackaged repository, everything else to the regular one.
pub fn destination_repository(client: Option<&str>) -> &'static str {
    match client {
        Some("importare") => UNPACKAGED_REPO,
        _ => INSTALLED_REPO,
    }
}

/// On-disk entry of one installed package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDir {
    path: PathBuf,
}

impl PackageDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest_path(&self) -> Option<PathBuf> {
        MANIFEST_FILE_NAMES
            .iter()
            .map(|name| self.path.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn slot(&self) -> String {
        SLOT_FILE_NAMES
            .iter()
            .map(|name| self.path.join(name))
            .find_map(|candidate| fs::read_to_string(candidate).ok())
            .map(|raw| raw.trim().to_string())
            .filter(|slot| !slot.is_empty())
            .unwrap_or_else(|| DEFAULT_SLOT.to_string())
    }
}
