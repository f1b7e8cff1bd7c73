//! Key-level difference between two snapshots.

use std::collections::BTreeMap;

use crate::entries::Snapshot;

/// Changes that move a destination from one snapshot to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Keys absent from the old snapshot.
    pub added: BTreeMap<String, String>,
    /// Keys whose value changed.
    pub updated: BTreeMap<String, String>,
    /// Keys absent from the new snapshot.
    pub removed: Vec<String>,
}

impl Diff {
    pub fn between(old: &Snapshot, new: &Snapshot) -> Self {
        let mut diff = Diff::default();

        for (key, value) in new {
            match old.get(key) {
                None => {
                    diff.added.insert(key.clone(), value.clone());
                }
                Some(previous) if previous != value => {
                    diff.updated.insert(key.clone(), value.clone());
                }
                Some(_) => {}
            }
        }

        diff.removed = old
            .keys()
            .filter(|key| !new.contains_key(*key))
            .cloned()
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Number of keys touched.
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}
