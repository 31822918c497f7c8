//! Reading local files into uploads.

use anyhow::{Context, Result};
use mime::Mime;
use roost_core::UploadFile;
use roost_core::file_type::image_mime_from_name;
use std::path::Path;

/// Read `path` into an [`UploadFile`], guessing its MIME type from the
/// extension. Unknown extensions are sent as `application/octet-stream` and
/// rejected by the pipeline's type check.
pub async fn read_upload(path: &Path) -> Result<UploadFile> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mime = guess_mime(&name);
    Ok(UploadFile::new(name, mime, bytes))
}

fn guess_mime(name: &str) -> Mime {
    image_mime_from_name(name).unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
