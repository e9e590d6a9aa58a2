//! File-search knowledge base over an object store.
//!
//! Matching is a case-insensitive substring test over each file's full
//! decoded text; the excerpt is a window centred on the first match.

mod cache;
pub mod local;
pub mod supabase;

use crate::db::models::Language;
use crate::doc_processor::DocError;
use crate::i18n;
use async_trait::async_trait;
use cache::FileCache;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use local::LocalDirStore;
pub use supabase::{SupabaseConfig, SupabaseStorage};

pub const EXCERPT_CHARS: usize = 300;
pub const MAX_CONTEXT_FILES: usize = 3;
const PARALLEL_DOWNLOADS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] DocError),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub file_name: String,
    pub excerpt: String,
}

/// Read-only object storage holding the knowledge files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ObjectEntry>, KnowledgeError>;
    async fn download(&self, name: &str) -> Result<String, KnowledgeError>;
}

pub struct KnowledgeBase {
    store: Arc<dyn BlobStore>,
    cache: Mutex<FileCache>,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn BlobStore>, cache_capacity: usize) -> Self {
        Self {
            store,
            cache: Mutex::new(FileCache::new(cache_capacity)),
        }
    }

    pub async fn list_files(&self) -> Result<Vec<ObjectEntry>, KnowledgeError> {
        self.store.list().await
    }

    pub async fn read_file(&self, name: &str) -> Result<String, KnowledgeError> {
        let cached = self.cache.lock().get(name);
        if let Some(content) = cached {
            return Ok(content);
        }
        let content = self.store.download(name).await?;
        let mut cache = self.cache.lock();
        cache.insert(name.to_string(), content.clone());
        debug!(file = name, cached = cache.len(), "Knowledge file cached");
        Ok(content)
    }

    /// Files whose text contains `query`, in listing order. Unreadable files are skipped.
    pub async fn search_in_files(&self, query: &str) -> Result<Vec<SearchHit>, KnowledgeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let files = self.list_files().await?;

        // Owned names and a materialized list keep the returned future `Send`.
        let downloads: Vec<_> = files
            .iter()
            .map(|file| file.name.clone())
            .map(|name| async move {
                let result = self.read_file(&name).await;
                (name, result)
            })
            .collect();
        let reads: Vec<_> = futures::stream::iter(downloads)
            .buffered(PARALLEL_DOWNLOADS)
            .collect()
            .await;

        let mut hits = Vec::new();
        for (name, result) in reads {
            let content = match result {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unreadable knowledge file");
                    continue;
                }
            };
            if let Some(at) = find_case_insensitive(&content, query) {
                hits.push(SearchHit {
                    excerpt: excerpt_at(&content, Some(at)),
                    file_name: name,
                });
            }
        }
        debug!(query, files = files.len(), hits = hits.len(), "Knowledge search done");
        Ok(hits)
    }

    /// Excerpts from up to three matching files, ready to prepend to a question.
    pub async fn context_for(
        &self,
        query: &str,
        language: Language,
    ) -> Result<String, KnowledgeError> {
        let hits = self.search_in_files(query).await?;
        let from_file = i18n::strings(language).from_file;
        Ok(hits
            .iter()
            .take(MAX_CONTEXT_FILES)
            .map(|hit| format!("{} \"{}\":\n{}", from_file, hit.file_name, hit.excerpt))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Char offset of the first case-insensitive occurrence of `needle` in `haystack`.
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Some(0);
    }
    // Lowercasing can expand a char, so keep each lowered char's source offset.
    let mut lowered = Vec::new();
    let mut origin = Vec::new();
    for (i, c) in haystack.chars().enumerate() {
        for lc in c.to_lowercase() {
            lowered.push(lc);
            origin.push(i);
        }
    }
    lowered
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
        .map(|p| origin[p])
}

/// Window around char offset `at`; the leading window when there is no match.
fn excerpt_at(content: &str, at: Option<usize>) -> String {
    let chars: Vec<char> = content.chars().collect();
    let (start, end) = match at {
        Some(i) => (
            i.saturating_sub(EXCERPT_CHARS / 2),
            (i + EXCERPT_CHARS / 2).min(chars.len()),
        ),
        None => (0, EXCERPT_CHARS.min(chars.len())),
    };
    chars[start..end].iter().collect()
}
