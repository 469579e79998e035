use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaPathError {
    #[error("media path cannot be empty")]
    Empty,

    #[error("media path cannot be absolute or contain parent components: {0}")]
    Unsafe(String),
}

/// Path of an asset inside the blob store, e.g. `lessons/audio/intro.mp3`.
///
/// This is the stored reference; the media store resolves it to a playable
/// URL at playback time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaPath(String);

impl MediaPath {
    /// Validate a storage path.
    ///
    /// # Errors
    ///
    /// Returns `MediaPathError` if the path is empty, absolute, or tries to
    /// escape the store root.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, MediaPathError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(MediaPathError::Empty);
        }
        if raw.starts_with('/') || raw.split('/').any(|part| part == "..") {
            return Err(MediaPathError::Unsafe(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
