//! Document input abstraction.
//!
//! This module provides `DocumentSource`, which lets callers hand the engine
//! a definitions document from disk or from memory. The engine itself only
//! ever sees the raw bytes.

use crate::core::error::ScanError;

use std::path::{Path, PathBuf};

/// Where a definitions document comes from.
///
/// # Examples
///
/// ```rust
/// use ovalscan::core::DocumentSource;
///
/// // From a file path
/// let source = DocumentSource::from_path("/etc/oval/baseline.xml");
///
/// // From bytes (e.g. embedded or downloaded)
/// let source = DocumentSource::from_bytes(b"<oval_definitions/>".to_vec())
///     .with_name("embedded");
/// assert_eq!(source.name(), "embedded");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A document on disk.
    Path(PathBuf),

    /// An in-memory document with an optional display name.
    Bytes {
        /// The document data.
        data: Vec<u8>,
        /// Optional name used in logs and errors.
        name: Option<String>,
    },
}

impl DocumentSource {
    /// Creates a source from a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates a source from bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            data: data.into(),
            name: None,
        }
    }

    /// Sets the display name of an in-memory source.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        if let Self::Bytes { name: n, .. } = &mut self {
            *n = Some(name.into());
        }
        self
    }

    /// Returns a display name for logs and errors.
    pub fn name(&self) -> &str {
        match self {
            Self::Path(path) => path.to_str().unwrap_or("<non-utf8 path>"),
            Self::Bytes { name, .. } => name.as_deref().unwrap_or("<memory>"),
        }
    }

    /// Returns the path, if this is a path-based source.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Bytes { .. } => None,
        }
    }

    /// Reads the raw document bytes.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Input` if the file cannot be read.
    pub async fn read(&self) -> Result<Vec<u8>, ScanError> {
        match self {
            Self::Path(path) => tokio::fs::read(path).await.map_err(|source| ScanError::Input {
                source_name: self.name().to_string(),
                source,
            }),
            Self::Bytes { data, .. } => Ok(data.clone()),
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&[u8]> for DocumentSource {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data.to_vec())
    }
}
