//! Publication as a single dynamic configuration file.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::entries::Snapshot;
use crate::export::tree::{build_tree, Segment, TreeWriter};
use crate::export::{ExportError, ExportOutcome, Exporter};
use crate::reconcile::Diff;

/// Rewrites the whole file from the new snapshot whenever it changed.
#[derive(Debug, Clone)]
pub struct FileExporter {
    path: PathBuf,
    root: String,
    writer: TreeWriter,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>, root: impl Into<String>, indent: usize) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
            writer: TreeWriter::new(indent),
        }
    }

    /// Document for `snapshot`, without the namespace root level.
    pub fn render(&self, snapshot: &Snapshot) -> String {
        let tree = build_tree(snapshot);
        match tree.child(&Segment::Name(self.root.clone())) {
            Some(namespace) => self.writer.render(namespace),
            None => String::new(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn write_atomically(&self, content: &str) -> Result<(), ExportError> {
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| ExportError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| ExportError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl Exporter for FileExporter {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn export(&self, old: &Snapshot, new: &Snapshot) -> Result<ExportOutcome, ExportError> {
        if old == new {
            return Ok(ExportOutcome::Unchanged);
        }

        let content = self.render(new);
        self.write_atomically(&content).await?;

        let deleted = Diff::between(old, new).removed.len();
        tracing::info!(
            path = %self.path.display(),
            entries = new.len(),
            bytes = content.len(),
            "Dynamic configuration file written"
        );

        Ok(ExportOutcome::Applied {
            written: new.len(),
            deleted,
        })
    }
}
