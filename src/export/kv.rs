//! Incremental publication into a key-value store.

use async_trait::async_trait;

use crate::entries::keys::in_namespace;
use crate::entries::Snapshot;
use crate::export::store::KeyValueStore;
use crate::export::{ExportError, ExportOutcome, Exporter};

/// Applies snapshot transitions key by key.
///
/// Stale keys are deleted; a key is written only when the stored value
/// differs, so re-applying the same transition issues no writes. Nothing
/// outside the namespace root is ever touched.
pub struct KeyValueExporter<S> {
    store: S,
    root: String,
}

impl<S: KeyValueStore> KeyValueExporter<S> {
    pub fn new(store: S, root: impl Into<String>) -> Self {
        Self {
            store,
            root: root.into(),
        }
    }

    fn owns(&self, key: &str) -> bool {
        if in_namespace(key, &self.root) {
            return true;
        }
        tracing::warn!(key, root = %self.root, "Refusing to touch key outside namespace");
        false
    }
}

#[async_trait]
impl<S: KeyValueStore> Exporter for KeyValueExporter<S> {
    fn name(&self) -> &'static str {
        "kv"
    }

    async fn export(&self, old: &Snapshot, new: &Snapshot) -> Result<ExportOutcome, ExportError> {
        let mut deleted = 0;
        for key in old.keys().filter(|k| !new.contains_key(*k)) {
            if !self.owns(key) {
                continue;
            }
            self.store
                .delete(key)
                .await
                .map_err(|source| ExportError::Store {
                    op: "delete",
                    key: key.clone(),
                    source,
                })?;
            deleted += 1;
        }

        let mut written = 0;
        for (key, value) in new {
            if !self.owns(key) {
                continue;
            }
            let current = self
                .store
                .get(key)
                .await
                .map_err(|source| ExportError::Store {
                    op: "get",
                    key: key.clone(),
                    source,
                })?;
            if current.as_deref() == Some(value.as_str()) {
                continue;
            }
            self.store
                .set(key, value)
                .await
                .map_err(|source| ExportError::Store {
                    op: "set",
                    key: key.clone(),
                    source,
                })?;
            written += 1;
        }

        tracing::debug!(written, deleted, "Key-value export finished");

        if written == 0 && deleted == 0 {
            Ok(ExportOutcome::Unchanged)
        } else {
            Ok(ExportOutcome::Applied { written, deleted })
        }
    }
}
