use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clashguard_core::{split_name_version, FileRecord, ManifestError, PackageRef};

use crate::{ManifestIndex, PackageDir, RepositoryConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub id: PackageRef,
    pub dir: PackageDir,
}

impl InstalledPackage {
    pub fn load_manifest(&self) -> Result<Vec<FileRecord>, ManifestError> {
        ManifestIndex::load(self)
    }
}

/// Versions of one package name, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackageName {
    pub name: String,
    pub versions: Vec<InstalledPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledCategory {
    pub name: String,
    pub packages: Vec<InstalledPackageName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRepository {
    pub name: String,
    pub categories: Vec<InstalledCategory>,
}

/// Read-only snapshot of every installed package, layered as repository,
/// category, package name and version. Every level is kept sorted (repositories
/// in configuration order) so iteration is reproducible between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledIndex {
    repositories: Vec<InstalledRepository>,
}

impl InstalledIndex {
    pub fn from_repositories(repositories: Vec<InstalledRepository>) -> Self {
        Self { repositories }
    }

    pub fn load(configs: &[RepositoryConfig]) -> Result<Self> {
        let mut repositories = Vec::with_capacity(configs.len());
        for config in configs {
            repositories.push(load_repository(config)?);
        }
        Ok(Self { repositories })
    }

    pub fn repositories(&self) -> &[InstalledRepository] {
        &self.repositories
    }

    pub fn versions_of(&self, repository: &str, category: &str, name: &str) -> &[InstalledPackage] {
        self.repositories
            .iter()
            .filter(|repo| repo.name == repository)
            .flat_map(|repo| repo.categories.iter())
            .filter(|cat| cat.name == category)
            .flat_map(|cat| cat.packages.iter())
            .find(|pkg| pkg.name == name)
            .map(|pkg| pkg.versions.as_slice())
            .unwrap_or_default()
    }

    /// Every installed package in repository, category, name, version order.
    pub fn packages(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.repositories
            .iter()
            .flat_map(|repo| repo.categories.iter())
            .flat_map(|cat| cat.packages.iter())
            .flat_map(|pkg| pkg.versions.iter())
    }

    pub fn package_count(&self) -> usize {
        self.packages().count()
    }
}

fn load_repository(config: &RepositoryConfig) -> Result<InstalledRepository> {
    let mut repository = InstalledRepository {
        name: config.name.clone(),
        categories: Vec::new(),
    };
    if !config.location.is_dir() {
        tracing::debug!(
            target: "clashguard.installed",
            repository = %config.name,
            location = %config.location.display(),
            "repository location missing, treating as empty"
        );
        return Ok(repository);
    }

    for category_dir in sorted_subdirs(&config.location)? {
        let Some(category) = dir_name(&category_dir) else {
            continue;
        };
        let mut by_name: BTreeMap<String, Vec<InstalledPackage>> = BTreeMap::new();
        for package_dir in sorted_subdirs(&category_dir)? {
            let Some(entry_name) = dir_name(&package_dir) else {
                continue;
            };
            let Some((name, version)) = split_name_version(&entry_name) else {
                tracing::debug!(
                    target: "clashguard.installed",
                    path = %package_dir.display(),
                    "skipping entry without a parseable version"
                );
                continue;
            };
            let dir = PackageDir::new(&package_dir);
            let id = PackageRef::new(&category, name, version, dir.slot(), &config.name);
            by_name
                .entry(name.to_string())
                .or_default()
                .push(InstalledPackage { id, dir });
        }

        if by_name.is_empty() {
            continue;
        }
        let packages = by_name
            .into_iter()
            .map(|(name, mut versions)| {
                versions.sort_by(|a, b| a.id.version.cmp(&b.id.version));
                InstalledPackageName { name, versions }
            })
            .collect();
        repository.categories.push(InstalledCategory {
            name: category,
            packages,
        });
    }

    Ok(repository)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if dir_name(&path).is_some_and(|name| name.starts_with('.')) {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
