use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type CheckResult<T> = Result<T, CheckError>;

/// Errors that abort a collision check.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to read staging tree at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("required install variable {0} is not set")]
    MissingVariable(String),

    #[error("invalid version '{value}' in {variable}")]
    InvalidVersion {
        variable: String,
        value: String,
        #[source]
        source: VersionError,
    },
}

impl CheckError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A package manifest that cannot supply ownership data. Callers recover from
/// this by treating the package as owning nothing.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no contents manifest under {location}")]
    Missing { location: PathBuf },

    #[error("failed to read contents manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed contents manifest {path} at line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("version must not be empty")]
    Empty,

    #[error("version component '{0}' is not numeric")]
    Component(String),

    #[error("unknown version suffix '{0}'")]
    Suffix(String),

    #[error("invalid revision '{0}'")]
    Revision(String),
}
