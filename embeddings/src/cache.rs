//! Persistent embedding cache.
//!
//! Entries are keyed by a SHA-256 digest of the model identifier and the exact
//! input text. The cache is an optimization: every read and write fails soft,
//! so a broken store degrades to recomputation instead of an error.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Version written into every persisted entry. Entries with another version
/// are ignored on read.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Deterministic key for a (model, text) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for `text` embedded by `model_id`.
    ///
    /// Whitespace is significant: `"a"` and `"a "` map to different keys.
    pub fn for_text(model_id: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model_id.as_bytes());
        hasher.update(b":");
        hasher.update(text.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Entry format version.
    pub version: u32,

    /// Model that produced the embedding.
    pub model: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// Unix seconds when the entry was written.
    pub created_at: u64,
}

impl CacheEntry {
    fn new(model: &str, embedding: &[f32]) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            model: model.to_string(),
            embedding: embedding.to_vec(),
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

/// Storage backend for cache entries.
///
/// Backends report failures; [`EmbeddingCache`] decides that they are not fatal.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Directory backing the store, if any.
    fn location(&self) -> Option<&Path>;

    /// Load an entry. `Ok(None)` when the key was never stored.
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Persist an entry, replacing any previous value for the key.
    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()>;

    /// Remove every entry, leaving an empty store behind.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}

/// One JSON file per key under a cache directory.
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| EmbeddingError::Cache(format!("{}: {e}", root.display())))?;

        Ok(Self { root })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    fn location(&self) -> Option<&Path> {
        Some(&self.root)
    }

    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EmbeddingError::Cache(format!("{}: {e}", path.display())));
            }
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        Ok(Some(entry))
    }

    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let path = self.entry_path(key);
        let content = serde_json::to_vec(entry)?;

        // Every writer, in any process, gets a uniquely named temp file.
        let root = self.root.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&root)?;
            temp.write_all(&content)?;
            temp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| EmbeddingError::Cache(format!("cache write task failed: {e}")))?
        .map_err(|e| EmbeddingError::Cache(format!("{}: {e}", path.display())))
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EmbeddingError::Cache(format!(
                    "{}: {e}",
                    self.root.display()
                )));
            }
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| EmbeddingError::Cache(format!("{}: {e}", self.root.display())))?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// In-process store, lost when the process exits.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn location(&self) -> Option<&Path> {
        None
    }

    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        self.entries.write().await.insert(key.clone(), entry.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// Embedding cache over a pluggable [`CacheStore`].
#[derive(Clone)]
pub struct EmbeddingCache {
    store: Arc<dyn CacheStore>,
}

impl EmbeddingCache {
    /// Wrap an existing store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// Cache persisted as one file per entry under `dir`.
    pub async fn on_disk(dir: impl AsRef<Path>) -> Result<Self> {
        let store = FsCacheStore::open(dir).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Compute the key for `text` embedded by `model_id`.
    pub fn key_for(model_id: &str, text: &str) -> CacheKey {
        CacheKey::for_text(model_id, text)
    }

    /// Directory backing the cache, if it is persisted.
    pub fn location(&self) -> Option<&Path> {
        self.store.location()
    }

    /// Look up an embedding. Unreadable or outdated entries count as misses.
    pub async fn get(&self, key: &CacheKey) -> Option<Embedding> {
        match self.store.load(key).await {
            Ok(Some(entry)) if entry.version == CACHE_FORMAT_VERSION => {
                debug!("Cache hit for {key}");
                Some(entry.embedding)
            }
            Ok(Some(entry)) => {
                warn!(
                    "Ignoring cache entry {key} with format version {} (expected {CACHE_FORMAT_VERSION})",
                    entry.version
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read cache entry {key}: {e}");
                None
            }
        }
    }

    /// Store an embedding. Write failures are logged and dropped.
    pub async fn put(&self, key: &CacheKey, model_id: &str, embedding: &[f32]) {
        let entry = CacheEntry::new(model_id, embedding);
        match self.store.store(key, &entry).await {
            Ok(()) => debug!("Cached embedding {key} (model: {model_id})"),
            Err(e) => warn!("Failed to write cache entry {key}: {e}"),
        }
    }

    /// Remove every entry.
    pub async fn clear_all(&self) {
        match self.store.clear().await {
            Ok(()) => info!("Cleared embedding cache"),
            Err(e) => error!("Failed to clear embedding cache: {e}"),
        }
    }

    /// Number of stored entries, or 0 if the store cannot be listed.
    pub async fn len(&self) -> usize {
        match self.store.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count cache entries: {e}");
                0
            }
        }
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
