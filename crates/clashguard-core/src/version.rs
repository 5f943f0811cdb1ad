use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::VersionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum SuffixKind {
    Alpha,
    Beta,
    Pre,
    Rc,
    Patch,
}

impl SuffixKind {
    fn parse(value: &str) -> Option<(Self, &str)> {
        for (prefix, kind) in [
            ("alpha", Self::Alpha),
            ("beta", Self::Beta),
            ("pre", Self::Pre),
            ("rc", Self::Rc),
            ("p", Self::Patch),
        ] {
            if let Some(rest) = value.strip_prefix(prefix) {
                return Some((kind, rest));
            }
        }
        None
    }

    // Ordering relative to "no further suffix": only patch levels sort after it.
    fn cmp_to_release(self) -> Ordering {
        match self {
            Self::Patch => Ordering::Greater,
            _ => Ordering::Less,
        }
    }
}

/// Package version of the `1.2.3a_rc1-r2` shape.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
    numbers: Vec<u64>,
    letter: Option<char>,
    suffixes: Vec<(SuffixKind, u64)>,
    revision: u64,
}

impl PackageVersion {
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let (body, revision) = match trimmed.rsplit_once("-r") {
            Some((body, rev)) => {
                if rev.is_empty() || !rev.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::Revision(rev.to_string()));
                }
                let revision = rev
                    .parse()
                    .map_err(|_| VersionError::Revision(rev.to_string()))?;
                (body, revision)
            }
            None => (trimmed, 0),
        };

        let mut pieces = body.split('_');
        let head = pieces.next().unwrap_or_default();
        let (numeric, letter) = match head.chars().last() {
            Some(ch) if ch.is_ascii_lowercase() => (&head[..head.len() - 1], Some(ch)),
            _ => (head, None),
        };

        let mut numbers = Vec::new();
        for component in numeric.split('.') {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::Component(component.to_string()));
            }
            numbers.push(
                component
                    .parse()
                    .map_err(|_| VersionError::Component(component.to_string()))?,
            );
        }

        let mut suffixes = Vec::new();
        for piece in pieces {
            let Some((kind, digits)) = SuffixKind::parse(piece) else {
                return Err(VersionError::Suffix(piece.to_string()));
            };
            let number = if digits.is_empty() {
                0
            } else if digits.bytes().all(|b| b.is_ascii_digit()) {
                digits
                    .parse()
                    .map_err(|_| VersionError::Suffix(piece.to_string()))?
            } else {
                return Err(VersionError::Suffix(piece.to_string()));
            };
            suffixes.push((kind, number));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            numbers,
            letter,
            suffixes,
            revision,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn cmp_suffixes(&self, other: &Self) -> Ordering {
        let mut ours = self.suffixes.iter();
        let mut theirs = other.suffixes.iter();
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return Ordering::Equal,
                (Some((kind, _)), None) => return kind.cmp_to_release(),
                (None, Some((kind, _))) => return kind.cmp_to_release().reverse(),
                (Some(a), Some(b)) => match a.cmp(b) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                },
            }
        }
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers
            .cmp(&other.numbers)
            .then_with(|| self.letter.cmp(&other.letter))
            .then_with(|| self.cmp_suffixes(other))
            .then_with(|| self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numbers.hash(state);
        self.letter.hash(state);
        self.suffixes.hash(state);
        self.revision.hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits `name-version` at the first hyphen whose remainder is a valid
/// version, e.g. `font-util-1.4-r1` into `font-util` and `1.4-r1`.
pub fn split_name_version(value: &str) -> Option<(&str, PackageVersion)> {
    value
        .char_indices()
        .filter(|(idx, ch)| *ch == '-' && *idx > 0)
        .find_map(|(idx, _)| {
            PackageVersion::parse(&value[idx + 1..])
                .ok()
                .map(|version| (&value[..idx], version))
        })
}
