use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::version::PackageVersion;

/// Identity of one installed package. Equality, hashing and ordering all go
/// through [`PackageRef::canonical_form`].
#[derive(Debug, Clone)]
pub struct PackageRef {
    pub category: String,
    pub name: String,
    pub version: PackageVersion,
    pub slot: String,
    pub repository: String,
}

impl PackageRef {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        version: PackageVersion,
        slot: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            version,
            slot: slot.into(),
            repository: repository.into(),
        }
    }

    pub fn canonical_form(&self) -> String {
        format!(
            "{}/{}-{}:{}::{}",
            self.category, self.name, self.version, self.slot, self.repository
        )
    }
}

impl PartialEq for PackageRef {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

impl Eq for PackageRef {}

impl Hash for PackageRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_form().hash(state);
    }
}

impl Ord for PackageRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_form().cmp(&other.canonical_form())
    }
}

impl PartialOrd for PackageRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_form())
    }
}

impl Serialize for PackageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical_form())
    }
}
