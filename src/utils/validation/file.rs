//! Upload validation
//!
//! Decides whether a candidate file may enter the pipeline, based only on
//! what the file source declares (name, MIME type, size). Nothing is read.

use crate::config::StudioConfig;
use crate::error::{InvalidFileKind, Result, StudioError};
use crate::services::format::format_size;
use crate::types::{AcceptedFile, FileDescriptor, ImageKind};

/// Validator for candidate uploads
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_size_bytes: u64,
    accepted: Vec<ImageKind>,
}

impl FileValidator {
    #[must_use]
    pub fn new(max_size_bytes: u64, accepted: Vec<ImageKind>) -> Self {
        Self {
            max_size_bytes,
            accepted,
        }
    }

    #[must_use]
    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.max_file_size_bytes, config.accepted_kinds.clone())
    }

    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Accept or reject a file descriptor.
    ///
    /// Malformed descriptors are reported before policy checks, then the
    /// type is checked before the size.
    ///
    /// # Errors
    /// - `InvalidFile` with `Malformed` for an empty name, a missing or
    ///   unparsable MIME type, or a zero-byte file
    /// - `InvalidFile` with `UnsupportedType` for types outside the accepted set
    /// - `InvalidFile` with `TooLarge` above the size limit
    pub fn validate(&self, descriptor: &FileDescriptor) -> Result<AcceptedFile> {
        let name = descriptor.name.trim();
        if name.is_empty() {
            return Err(StudioError::invalid_file(
                InvalidFileKind::Malformed,
                "The selected file has no name",
            ));
        }

        let mime = descriptor.mime_type.trim();
        if !is_well_formed_mime(mime) {
            return Err(StudioError::invalid_file(
                InvalidFileKind::Malformed,
                format!("Could not determine the type of '{}'", name),
            ));
        }

        if descriptor.size_bytes == 0 {
            return Err(StudioError::invalid_file(
                InvalidFileKind::Malformed,
                format!("'{}' is empty", name),
            ));
        }

        let kind = match ImageKind::from_mime(mime) {
            Some(kind) if self.accepted.contains(&kind) => kind,
            _ => {
                return Err(StudioError::invalid_file(
                    InvalidFileKind::UnsupportedType,
                    format!(
                        "Unsupported file type '{}'. Please choose a {} image",
                        mime,
                        self.accepted_list()
                    ),
                ));
            },
        };

        if descriptor.size_bytes > self.max_size_bytes {
            return Err(StudioError::invalid_file(
                InvalidFileKind::TooLarge,
                format!(
                    "'{}' is too large ({}). Maximum size is {}",
                    name,
                    format_size(descriptor.size_bytes),
                    format_size(self.max_size_bytes)
                ),
            ));
        }

        Ok(AcceptedFile {
            name: name.to_string(),
            size_bytes: descriptor.size_bytes,
            kind,
        })
    }

    fn accepted_list(&self) -> String {
        let labels: Vec<&str> = self.accepted.iter().map(|k| k.label()).collect();
        match labels.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
            Some((last, _)) => (*last).to_string(),
            None => String::new(),
        }
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

/// `type/subtype` with both halves present, parameters allowed
fn is_well_formed_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !essence.contains(char::is_whitespace)
        },
        None => false,
    }
}
