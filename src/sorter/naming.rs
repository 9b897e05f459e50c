//! Destination naming for sorted documents
//!
//! `output/<type>/<type>_<serial><.ext>`, where `<type>` is the lower-cased
//! label with spaces turned into underscores and `<serial>` keeps only
//! alphanumeric characters.

use std::path::{Path, PathBuf};

use crate::ai::ClassificationResult;

/// Lower-case a type label and replace spaces with underscores
pub fn sanitize_type(label: &str) -> String {
    label.replace(' ', "_").to_lowercase()
}

/// Strip every non-alphanumeric character from a serial number
pub fn sanitize_serial(serial: &str) -> String {
    serial.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Original extension including the dot, or an empty string
pub fn extension_suffix(source: &Path) -> String {
    source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// New file name for a classified document
pub fn sorted_file_name(result: &ClassificationResult, source: &Path) -> String {
    format!(
        "{}_{}{}",
        sanitize_type(result.document_type.label()),
        sanitize_serial(&result.serial_number),
        extension_suffix(source)
    )
}

/// Full destination path under `output_dir`
pub fn sorted_destination(
    output_dir: &Path,
    result: &ClassificationResult,
    source: &Path,
) -> PathBuf {
    output_dir
        .join(sanitize_type(result.document_type.label()))
        .join(sorted_file_name(result, source))
}
