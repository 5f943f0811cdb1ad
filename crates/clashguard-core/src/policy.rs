use serde::Serialize;

pub const FIXED_INFO_INDEX: &str = "/usr/share/info/dir";

#[derive(Debug, Clone, Default)]
pub struct IgnoreSetBuilder {
    prefixes: Vec<String>,
}

impl IgnoreSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every whitespace-separated word of a variable value.
    pub fn add_words(mut self, value: &str) -> Self {
        for word in value.split_whitespace() {
            self.push(word);
        }
        self
    }

    pub fn add_path(mut self, path: impl AsRef<str>) -> Self {
        self.push(path.as_ref().trim());
        self
    }

    pub fn add_optional(self, path: Option<impl AsRef<str>>) -> Self {
        match path {
            Some(path) => self.add_path(path),
            None => self,
        }
    }

    fn push(&mut self, prefix: &str) {
        if prefix.is_empty() || self.prefixes.iter().any(|known| known == prefix) {
            return;
        }
        self.prefixes.push(prefix.to_string());
    }

    pub fn build(self) -> IgnoreSet {
        IgnoreSet {
            prefixes: self.prefixes,
        }
    }
}

/// Frozen, deduplicated ignore prefixes in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IgnoreSet {
    prefixes: Vec<String>,
}

impl IgnoreSet {
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PathPolicy<'a> {
    ignore: &'a IgnoreSet,
}

impl<'a> PathPolicy<'a> {
    pub fn new(ignore: &'a IgnoreSet) -> Self {
        Self { ignore }
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        let parent = match path.rsplit_once('/') {
            Some(("", _)) => "/",
            Some((parent, _)) => parent,
            None => "",
        };
        self.ignore
            .prefixes
            .iter()
            .any(|prefix| parent.starts_with(prefix.as_str()) || path.starts_with(prefix.as_str()))
    }
}
