//! Image file-type allow-list.

use mime::Mime;

/// MIME types accepted for upload.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Check a MIME type against the allow-list, ignoring parameters.
pub fn is_allowed_image(mime: &Mime) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&mime.essence_str())
}

/// Guess an image MIME type from a file name's extension.
pub fn image_mime_from_name(name: &str) -> Option<Mime> {
    let (_, ext) = name.rsplit_once('.')?;
    let essence = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => return None,
    };
    essence.parse().ok()
}
