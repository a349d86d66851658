//! File sources and the image loader
//!
//! A [`FileSource`] is whatever hands the pipeline a file: a path on disk,
//! bytes from a drag-and-drop payload, an upload buffer. The
//! [`ImageLoader`] turns an accepted source into a [`LoadedImage`].

use crate::{
    error::{Result, StudioError},
    types::{AcceptedFile, FileDescriptor, ImageKind, LoadedImage},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// MIME type reported when the source cannot tell what a file is
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Supplier of one file: its declared descriptor plus a byte read
#[async_trait]
pub trait FileSource: Send + Sync {
    /// What the source declares about the file, before any read
    fn descriptor(&self) -> FileDescriptor;

    /// Read the whole file
    ///
    /// # Errors
    /// - Any I/O failure of the underlying source
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>>;
}

/// A file on the local filesystem
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
    descriptor: FileDescriptor,
}

impl PathSource {
    /// Describe a file on disk. The declared MIME type comes from the
    /// extension, the size from the file metadata.
    ///
    /// # Errors
    /// - `ReadFailure` if the metadata cannot be read or the path is not a file
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| StudioError::read_failure(format!("{}: {}", path.display(), e)))?;

        if !metadata.is_file() {
            return Err(StudioError::read_failure(format!(
                "{}: not a regular file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageKind::from_extension)
            .map_or(UNKNOWN_MIME_TYPE, ImageKind::mime_type);

        Ok(Self {
            descriptor: FileDescriptor::new(name, mime_type, metadata.len()),
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for PathSource {
    fn descriptor(&self) -> FileDescriptor {
        self.descriptor.clone()
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// A file already held in memory, e.g. a drag-and-drop payload
#[derive(Debug, Clone)]
pub struct MemorySource {
    descriptor: FileDescriptor,
    bytes: Vec<u8>,
}

impl MemorySource {
    /// Wrap bytes with an explicit declared MIME type
    pub fn new<N: Into<String>, M: Into<String>>(name: N, mime_type: M, bytes: Vec<u8>) -> Self {
        let descriptor = FileDescriptor::new(name, mime_type, bytes.len() as u64);
        Self { descriptor, bytes }
    }

    /// Wrap bytes and a descriptor that may disagree with them
    #[must_use]
    pub fn with_descriptor(descriptor: FileDescriptor, bytes: Vec<u8>) -> Self {
        Self { descriptor, bytes }
    }
}

#[async_trait]
impl FileSource for MemorySource {
    fn descriptor(&self) -> FileDescriptor {
        self.descriptor.clone()
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Reads accepted files into renderable images
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader;

impl ImageLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Read the file and build its `data:` URI representation
    ///
    /// # Errors
    /// - `ReadFailure` on any I/O error or when the stream yields no bytes
    pub async fn load(&self, file: &AcceptedFile, source: &dyn FileSource) -> Result<LoadedImage> {
        let bytes = source
            .read_bytes()
            .await
            .map_err(|e| StudioError::read_failure(format!("{}: {}", file.name, e)))?;

        if bytes.is_empty() {
            return Err(StudioError::read_failure(format!(
                "{}: stream ended before any data was read",
                file.name
            )));
        }

        if bytes.len() as u64 != file.size_bytes {
            warn!(
                file = %file.name,
                declared = file.size_bytes,
                actual = bytes.len(),
                "Read size differs from declared size"
            );
        }

        debug!(file = %file.name, bytes = bytes.len(), kind = %file.kind, "File loaded");
        Ok(LoadedImage::new(file.kind, bytes))
    }
}
