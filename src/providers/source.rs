//! Document retrieval seam and a filesystem-backed implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::document::Document;
use crate::error::PipelineError;
use crate::types::DocumentRef;

/// Resolves a [`DocumentRef`] to a full [`Document`].
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, reference: &DocumentRef) -> Result<Document, PipelineError>;
}

/// Serves documents from a directory on disk. `Path` references resolve
/// relative to the root; `Inline` references are passed through. Stored-id
/// lookups belong to a real document store and are rejected here.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch(&self, reference: &DocumentRef) -> Result<Document, PipelineError> {
        match reference {
            DocumentRef::Path { path } => {
                let full = self.root.join(path);
                let text = tokio::fs::read_to_string(&full).await.map_err(|e| {
                    PipelineError::fetch(format!("cannot read {}: {e}", full.display()))
                })?;
                let title = Path::new(path)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                Ok(Document::new(path.clone(), title, text))
            }
            DocumentRef::Inline { title, text } => {
                Ok(Document::new(format!("inline:{title}"), title.clone(), text))
            }
            DocumentRef::Id { id } => Err(PipelineError::fetch(format!(
                "FileSource cannot resolve stored document id {id}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_path_references_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "alpha\r\nbeta").unwrap();
        let source = FileSource::new(dir.path());

        let doc = source
            .fetch(&DocumentRef::Path {
                path: "notes.md".into(),
            })
            .await
            .unwrap();
        assert_eq!(doc.title, "notes");
        assert_eq!(doc.text, "alpha\nbeta");
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path());
        let err = source
            .fetch(&DocumentRef::Path {
                path: "absent.md".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[tokio::test]
    async fn inline_references_pass_through() {
        let source = FileSource::new("/nonexistent");
        let doc = source
            .fetch(&DocumentRef::Inline {
                title: "Draft".into(),
                text: "body".into(),
            })
            .await
            .unwrap();
        assert_eq!(doc.id, "inline:Draft");
        assert_eq!(doc.text, "body");
    }
}
