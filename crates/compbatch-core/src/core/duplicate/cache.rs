//! Duplication Cache
//!
//! Per-job identity map from source scene ID to its clone. Created fresh for
//! every job and dropped when the job finishes; sharing it across jobs would
//! make jobs alias each other's clones.

use std::collections::HashMap;

use crate::core::ItemId;

/// Maps each source scene to its at-most-one clone for the current job
#[derive(Clone, Debug, Default)]
pub struct DuplicationCache {
    map: HashMap<ItemId, ItemId>,
}

impl DuplicationCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the clone registered for a source, if any
    pub fn get(&self, source_id: &ItemId) -> Option<&ItemId> {
        self.map.get(source_id)
    }

    /// Registers the clone of a source scene
    pub fn insert(&mut self, source_id: ItemId, clone_id: ItemId) {
        self.map.insert(source_id, clone_id);
    }

    /// Number of registered clones
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true when nothing has been cloned yet
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::new_id;

    #[test]
    fn test_insert_and_get() {
        let mut cache = DuplicationCache::new();
        let source = new_id();
        let clone = new_id();

        assert!(cache.get(&source).is_none());
        cache.insert(source.clone(), clone.clone());
        assert_eq!(cache.get(&source), Some(&clone));
        assert_eq!(cache.len(), 1);
    }
}
