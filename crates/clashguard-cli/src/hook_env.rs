use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use clashguard_check::CheckRequest;
use clashguard_core::{
    CheckError, CheckResult, IgnoreSet, IgnoreSetBuilder, PackageVersion, FIXED_INFO_INDEX,
};
use clashguard_installed::destination_repository;

use crate::config::CheckConfig;
use crate::discovery::read_bashrc_var_with_runner;

/// Read access to the variables the package manager exports to its hooks.
pub trait InstallVars {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }

    fn require(&self, key: &str) -> CheckResult<String> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(CheckError::MissingVariable(key.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessVars;

impl InstallVars for ProcessVars {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl InstallVars for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Command-line values that win over hook variables.
#[derive(Debug, Default, Clone)]
pub struct RequestOverrides {
    pub root: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub destination_repo: Option<String>,
}

pub fn target_root(vars: &dyn InstallVars, overrides: &RequestOverrides) -> PathBuf {
    if let Some(root) = &overrides.root {
        return root.clone();
    }
    match vars.get("ROOT") {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => PathBuf::from("/"),
    }
}

pub fn build_request(
    vars: &dyn InstallVars,
    overrides: &RequestOverrides,
) -> CheckResult<CheckRequest> {
    let image = match &overrides.image {
        Some(image) => image.clone(),
        None => PathBuf::from(vars.require("IMAGE")?),
    };
    let category = vars.require("CATEGORY")?;
    let name = vars.require("PN")?;
    let raw_version = vars.require("PVR")?;
    let version =
        PackageVersion::parse(&raw_version).map_err(|source| CheckError::InvalidVersion {
            variable: "PVR".to_string(),
            value: raw_version.clone(),
            source,
        })?;
    let slot = match vars.get("SLOT") {
        Some(slot) if !slot.is_empty() => slot,
        _ => "0".to_string(),
    };
    let destination_repo = match &overrides.destination_repo {
        Some(repo) => repo.clone(),
        None => destination_repository(vars.get("PALUDIS_CLIENT").as_deref()).to_string(),
    };

    Ok(CheckRequest {
        category,
        name,
        version,
        slot,
        image,
        root: target_root(vars, overrides),
        destination_repo,
    })
}

pub fn collision_ignore(vars: &dyn InstallVars) -> String {
    collision_ignore_with_runner(vars, crate::discovery::capture_stdout)
}

/// `COLLISION_IGNORE` from the environment, else from the bashrc files.
pub fn collision_ignore_with_runner<RunCommand>(vars: &dyn InstallVars, run: RunCommand) -> String
where
    RunCommand: FnMut(&mut Command, &str) -> Result<String>,
{
    if let Some(value) = vars.get("COLLISION_IGNORE") {
        return value;
    }
    let bashrc_files = vars.get_or_empty("PALUDIS_BASHRC_FILES");
    read_bashrc_var_with_runner(&bashrc_files, "COLLISION_IGNORE", run).unwrap_or_default()
}

pub fn build_ignore_set(
    vars: &dyn InstallVars,
    collision_ignore: &str,
    config: &CheckConfig,
    info_dir: Option<&Path>,
) -> IgnoreSet {
    let mut builder = IgnoreSetBuilder::new()
        .add_words(collision_ignore)
        .add_words(&vars.get_or_empty("CONFIG_PROTECT_MASK"))
        .add_words(&vars.get_or_empty("CONFIG_PROTECT"))
        .add_path(FIXED_INFO_INDEX)
        .add_optional(info_dir.map(|dir| dir.join("dir").to_string_lossy().into_owned()));
    for extra in &config.extra_ignore {
        builder = builder.add_path(extra);
    }
    builder.build()
}
