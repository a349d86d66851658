//! Core types for the upload pipeline

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Image types the pipeline knows how to name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    #[serde(rename = "webp")]
    WebP,
}

impl ImageKind {
    /// All image kinds, in the order they are listed to users
    pub const ALL: [ImageKind; 3] = [ImageKind::Png, ImageKind::Jpeg, ImageKind::WebP];

    /// Parse a declared MIME type such as `image/png` or `IMAGE/JPEG; q=1`
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Guess the declared type from a file extension, the way a browser file input does
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::WebP => "WEBP",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a file picker or drop zone tells us about a file before reading it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    /// Declared MIME type; may be empty when the source could not tell
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileDescriptor {
    pub fn new<N: Into<String>, M: Into<String>>(name: N, mime_type: M, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }
}

/// A descriptor that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedFile {
    pub name: String,
    pub size_bytes: u64,
    pub kind: ImageKind,
}

/// File bytes materialized into something a presentation layer can render
#[derive(Clone)]
pub struct LoadedImage {
    pub kind: ImageKind,
    bytes: Arc<[u8]>,
    data_uri: Arc<str>,
}

impl LoadedImage {
    #[must_use]
    pub fn new(kind: ImageKind, bytes: Vec<u8>) -> Self {
        let data_uri = format!("data:{};base64,{}", kind.mime_type(), STANDARD.encode(&bytes));
        Self {
            kind,
            bytes: bytes.into(),
            data_uri: data_uri.into(),
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `data:<mime>;base64,...` representation for preview panes
    #[must_use]
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Binary result produced by the removal backend
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new<M: Into<String>>(mime_type: M, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Identifies one accepted submission; strictly increasing per pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owned handle to a binary resource held by the resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub(crate) u64);

impl ObjectHandle {
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:bgremove-studio/{}", self.0)
    }
}

impl Serialize for ObjectHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The file the user is currently working on
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub id: SubmissionId,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub kind: ImageKind,
    /// Present once the loader finished
    pub source_image: Option<LoadedImage>,
    /// Cancelled when this session is superseded or cleared
    pub token: CancellationToken,
}

impl UploadSession {
    #[must_use]
    pub fn new(id: SubmissionId, file: &AcceptedFile, token: CancellationToken) -> Self {
        Self {
            id,
            file_name: file.name.clone(),
            file_size_bytes: file.size_bytes,
            kind: file.kind,
            source_image: None,
            token,
        }
    }
}

/// Lifecycle of a processing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// One invocation of the removal backend for a session
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub submission: SubmissionId,
    pub status: JobStatus,
    /// 0-100; zero whenever the job is not running
    pub progress_percent: u8,
    pub token: CancellationToken,
}

/// The processed image owned by the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultArtifact {
    pub handle: ObjectHandle,
    pub session: SubmissionId,
}
