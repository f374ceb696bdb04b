use std::path::Path;

use crate::error::ValidationError;

/// Extensions accepted as images. Matching is case-sensitive.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "jpe", "jfif", "gif", "png"];

/// Split the file name at its dots, returning `(stem, extension)` where the
/// extension is the segment right after the *first* dot.
///
/// `a.tar.png` yields `("a", "tar")`. Both the validator and the copy-name
/// derivation rely on this exact split.
pub fn split_file_name(path: &str) -> Option<(&str, &str)> {
    let file_name = Path::new(path).file_name()?.to_str()?;
    let mut parts = file_name.split('.');
    let stem = parts.next()?;
    let extension = parts.next()?;
    Some((stem, extension))
}

/// Extension as seen by the validator (first-dot split).
pub fn image_extension(path: &str) -> Option<&str> {
    split_file_name(path).map(|(_, ext)| ext)
}

/// Check that `path` names an image the pipeline is willing to process.
///
/// Returns the accepted extension. Only the file name is inspected; the file
/// itself is not opened.
pub fn validate_image_path(path: &str) -> Result<&str, ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    let extension =
        image_extension(path).ok_or_else(|| ValidationError::MissingExtension(path.to_string()))?;

    if ALLOWED_EXTENSIONS.contains(&extension) {
        Ok(extension)
    } else {
        Err(ValidationError::UnsupportedExtension(extension.to_string()))
    }
}
