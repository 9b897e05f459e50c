//! Vision input checks
//!
//! Decides whether a file can be sent to the vision model at all.

use std::path::Path;

/// Guess the MIME type of a file from its extension.
///
/// Returns `None` for unknown extensions.
pub fn guess_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// MIME type of `path` if it names an image, `None` otherwise
pub fn image_mime_type(path: &Path) -> Option<String> {
    guess_mime_type(path).filter(|mime| mime.starts_with("image/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Path::new("scan.jpg")).as_deref(), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("scan.PNG")).as_deref(), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("/inbox/memo.webp")).as_deref(), Some("image/webp"));
    }

    #[test]
    fn test_non_images_are_rejected() {
        assert!(image_mime_type(Path::new("notes.txt")).is_none());
        assert!(image_mime_type(Path::new("report.pdf")).is_none());
        assert!(image_mime_type(Path::new("no_extension")).is_none());
    }

    #[test]
    fn test_guess_mime_type_keeps_non_images() {
        assert_eq!(guess_mime_type(Path::new("report.pdf")).as_deref(), Some("application/pdf"));
        assert!(guess_mime_type(Path::new("mystery")).is_none());
    }
}
