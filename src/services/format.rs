//! Naming and formatting helpers shared by the validator, view and download paths

use crate::config::OutputFormat;

/// Strip the last extension from a file name.
///
/// Dotfiles without another dot (`.env`) and names without a dot are
/// returned unchanged.
///
/// # Examples
/// ```rust
/// use bgremove_studio::services::format::strip_extension;
///
/// assert_eq!(strip_extension("photo.jpg"), "photo");
/// assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
/// assert_eq!(strip_extension("README"), "README");
/// ```
#[must_use]
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Name offered for a processed result: original base name plus the output extension
///
/// # Examples
/// ```rust
/// use bgremove_studio::{services::format::download_file_name, OutputFormat};
///
/// assert_eq!(download_file_name("photo.jpg", OutputFormat::Png), "photo.png");
/// ```
#[must_use]
pub fn download_file_name(original_name: &str, format: OutputFormat) -> String {
    let base = strip_extension(original_name.trim());
    let base = if base.is_empty() { "image" } else { base };
    format!("{}.{}", base, format.extension())
}

/// Human-readable byte size
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS.first().unwrap_or(&"B"))
    } else {
        format!("{:.1} {}", size, UNITS.get(unit_index).unwrap_or(&"B"))
    }
}
