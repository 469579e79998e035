use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use url::Url;

use spacey_core::model::MediaPath;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MediaStoreError {
    #[error("no media object at path: {0}")]
    NotFound(MediaPath),

    #[error("failed to resolve media url: {0}")]
    Resolve(String),
}

/// Blob-store contract: turn a stored asset path into a playable URL.
///
/// Production backends hand out time-limited URLs; resolution is therefore
/// async and repeated per playback rather than cached on the lesson.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Resolve `path` to a URL the audio/image pipeline can load.
    ///
    /// # Errors
    ///
    /// Returns `MediaStoreError::NotFound` when no object exists at `path`
    /// and `MediaStoreError::Resolve` for backend failures.
    async fn resolve(&self, path: &MediaPath) -> Result<Url, MediaStoreError>;
}

/// Media store for local development: joins paths onto a base URL, typically
/// a static file server alongside the app.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    base: Url,
}

impl LocalMediaStore {
    /// # Errors
    ///
    /// Returns `MediaStoreError::Resolve` if `base` cannot serve as a join
    /// root (e.g. a cannot-be-a-base URL).
    pub fn new(base: Url) -> Result<Self, MediaStoreError> {
        if base.cannot_be_a_base() {
            return Err(MediaStoreError::Resolve(format!(
                "base url cannot be joined against: {base}"
            )));
        }
        Ok(Self { base })
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn resolve(&self, path: &MediaPath) -> Result<Url, MediaStoreError> {
        self.base
            .join(path.as_str())
            .map_err(|e| MediaStoreError::Resolve(e.to_string()))
    }
}

/// In-memory store for tests: explicit path → URL entries, everything else
/// is `NotFound`.
#[derive(Clone, Default)]
pub struct InMemoryMediaStore {
    entries: Arc<Mutex<HashMap<String, Url>>>,
}

impl InMemoryMediaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolvable object.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn insert(&self, path: &MediaPath, url: Url) {
        self.entries
            .lock()
            .expect("media store lock poisoned")
            .insert(path.as_str().to_string(), url);
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn resolve(&self, path: &MediaPath) -> Result<Url, MediaStoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| MediaStoreError::Resolve(e.to_string()))?;
        entries
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| MediaStoreError::NotFound(path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_joins_against_base() {
        let store =
            LocalMediaStore::new(Url::parse("http://localhost:8080/assets/").unwrap()).unwrap();
        let url = store
            .resolve(&MediaPath::new("lessons/audio/intro.mp3").unwrap())
            .await
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/assets/lessons/audio/intro.mp3"
        );
    }

    #[tokio::test]
    async fn in_memory_store_misses_are_not_found() {
        let store = InMemoryMediaStore::new();
        let path = MediaPath::new("lessons/audio/intro.mp3").unwrap();
        let err = store.resolve(&path).await.unwrap_err();
        assert!(matches!(err, MediaStoreError::NotFound(_)));

        store.insert(&path, Url::parse("http://cdn.test/intro.mp3").unwrap());
        assert!(store.resolve(&path).await.is_ok());
    }
}
