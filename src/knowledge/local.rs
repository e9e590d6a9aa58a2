use super::{BlobStore, KnowledgeError, ObjectEntry};
use crate::doc_processor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};

/// A directory of knowledge files on local disk.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, KnowledgeError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(KnowledgeError::InvalidName(name.to_string())),
        }
    }
}

#[async_trait]
impl BlobStore for LocalDirStore {
    async fn list(&self) -> Result<Vec<ObjectEntry>, KnowledgeError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .ok()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
            entries.push(ObjectEntry { name, created_at });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn download(&self, name: &str) -> Result<String, KnowledgeError> {
        let path = self.resolve(name)?;
        let bytes = tokio::fs::read(&path).await?;
        let name = name.to_string();
        // PDF extraction is CPU-bound.
        let text = tokio::task::spawn_blocking(move || doc_processor::decode(&name, &bytes))
            .await
            .map_err(|e| KnowledgeError::Io(std::io::Error::other(e)))??;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_and_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Admissions\nDeadline is July 25").unwrap();
        std::fs::write(dir.path().join("a.txt"), "Library: room 101").unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let store = LocalDirStore::new(dir.path());
        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.txt", "b.md"]);
        assert_eq!(store.download("a.txt").await.unwrap(), "Library: room 101");
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        for name in ["../secret.txt", "sub/a.txt", "/etc/passwd", ""] {
            assert!(
                matches!(store.download(name).await, Err(KnowledgeError::InvalidName(_))),
                "name: {name}"
            );
        }
    }
}
