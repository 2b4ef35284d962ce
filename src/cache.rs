//! Per-run cache of heading anchors, keyed by absolute normalized path.
//!
//! Entries are never invalidated during a run. Values are computed outside
//! the lock, so two workers racing on the same file may both compute it;
//! the first insert wins and the result is identical either way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::headings::{AnchorSet, HeadingAnchorIndex};

/// Shared read-mostly cache handed to the checker and the corrector.
#[derive(Debug, Default)]
pub struct AnchorCache {
    /// Deduplicated anchor sets for existence checks.
    anchor_sets: Mutex<HashMap<PathBuf, Arc<AnchorSet>>>,
    /// Ordered heading indices for position-based remapping.
    heading_indices: Mutex<HashMap<PathBuf, Arc<HeadingAnchorIndex>>>,
}

impl AnchorCache {
    /// Anchor set of the markdown file at `path`.
    /// An unreadable or unparsable file yields an empty set, which is not cached.
    pub fn anchor_set(&self, path: &Path) -> Arc<AnchorSet> {
        if let Some(hit) = lookup(&self.anchor_sets, path) {
            return hit;
        }
        let Some(index) = self.heading_index(path) else {
            return Arc::new(AnchorSet::new());
        };
        return insert(&self.anchor_sets, path, Arc::new(index.to_anchor_set()));
    }

    /// Number of cached anchor sets.
    pub fn anchor_set_count(&self) -> usize {
        return self.anchor_sets.lock().unwrap_or_else(PoisonError::into_inner).len();
    }

    /// Ordered heading index of the markdown file at `path`,
    /// or `None` if it cannot be read or parsed.
    pub fn heading_index(&self, path: &Path) -> Option<Arc<HeadingAnchorIndex>> {
        if let Some(hit) = lookup(&self.heading_indices, path) {
            return Some(hit);
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read headings");
                return None;
            },
        };
        let index = match HeadingAnchorIndex::from_markdown(&content) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot parse headings");
                return None;
            },
        };
        tracing::debug!(path = %path.display(), headings = index.len(), "indexed headings");
        return Some(insert(&self.heading_indices, path, Arc::new(index)));
    }

    /// Number of cached heading indices.
    pub fn heading_index_count(&self) -> usize {
        return self.heading_indices.lock().unwrap_or_else(PoisonError::into_inner).len();
    }
}

/// Insert unless another worker got there first; return the stored value.
fn insert<V>(map: &Mutex<HashMap<PathBuf, Arc<V>>>, key: &Path, value: Arc<V>) -> Arc<V> {
    let mut guard = map.lock().unwrap_or_else(PoisonError::into_inner);
    return Arc::clone(guard.entry(key.to_path_buf()).or_insert(value));
}

/// Cached value for `key`, if any.
fn lookup<V>(map: &Mutex<HashMap<PathBuf, Arc<V>>>, key: &Path) -> Option<Arc<V>> {
    let guard = map.lock().unwrap_or_else(PoisonError::into_inner);
    return guard.get(key).map(Arc::clone);
}
