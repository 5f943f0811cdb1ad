use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clashguard_core::{canonicalize_path, root_join, FileRecord};

use crate::StagedEntry;

/// Resolves logical paths against the real directory structure of the target
/// root: symlinked parent directories are followed, the final component is
/// not.
#[derive(Debug, Clone)]
pub struct TargetRoot {
    root: PathBuf,
    real_root: PathBuf,
}

impl TargetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let real_root = fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
        Self { root, real_root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, logical: &str) -> String {
        let lexical = canonicalize_path(logical);
        let Some((parent, name)) = lexical.rsplit_once('/') else {
            return lexical;
        };
        if name.is_empty() {
            return lexical;
        }

        let Ok(real_parent) = fs::canonicalize(root_join(&self.root, parent)) else {
            return lexical;
        };
        match real_parent.strip_prefix(&self.real_root) {
            Ok(rel) => canonicalize_path(&format!("/{}/{}", rel.to_string_lossy(), name)),
            Err(_) => lexical,
        }
    }
}

/// Clears every colliding entry that the replaced version already owned with
/// the same file kind (and, for symlinks, the same target). Returns true when
/// nothing collides afterwards.
pub fn compare_with_previous(
    staged: &mut [StagedEntry],
    previous: &[FileRecord],
    root: &TargetRoot,
    progress_interval: usize,
    on_progress: &mut dyn FnMut(usize, usize),
) -> bool {
    let total = staged.len();
    let mut owned: Option<HashMap<String, &FileRecord>> = None;

    for (idx, entry) in staged.iter_mut().enumerate() {
        let done = idx + 1;
        if progress_interval > 0 && done % progress_interval == 0 {
            on_progress(done, total);
        }
        if !entry.collides() {
            continue;
        }

        let owned = owned.get_or_insert_with(|| {
            let mut by_path = HashMap::with_capacity(previous.len());
            for record in previous {
                by_path.entry(root.resolve(&record.path)).or_insert(record);
            }
            by_path
        });
        let matched = owned
            .get(&root.resolve(&entry.record.path))
            .is_some_and(|recorded| recorded.same_kind_as(&entry.record));
        if matched {
            entry.clear();
        }
    }

    staged.iter().all(|entry| !entry.collides())
}
