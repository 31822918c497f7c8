//! Remote media API trait definition.

use crate::error::RemoteResult;
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use roost_core::{ConfirmedMedia, MediaId, MediaTag, RemoteMedia, ResourceId, UploadId, UploadSlot};
use url::Url;

/// Backend operations the media pipeline consumes.
///
/// Every method is a single network round-trip and never retries on its own;
/// retry policy belongs to the caller.
#[async_trait]
pub trait MediaApi: Send + Sync + 'static {
    /// Phase 1: obtain a pre-authorized destination for one file.
    ///
    /// Fails with [`crate::RemoteError::Unauthorized`] if the caller lacks
    /// permission on `resource`, or [`crate::RemoteError::Quota`] if the tag is
    /// already full server-side.
    async fn request_upload_slot(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
        mime: &Mime,
    ) -> RemoteResult<UploadSlot>;

    /// Phase 2: transfer the bytes to the pre-authorized URL.
    async fn put_bytes(&self, put_url: &Url, bytes: Bytes, mime: &Mime) -> RemoteResult<()>;

    /// Phase 3: register the transferred bytes as a media item.
    ///
    /// Fails with [`crate::RemoteError::Confirmation`] if the backend never
    /// observed the phase-2 bytes.
    async fn confirm_upload(&self, upload_id: &UploadId) -> RemoteResult<ConfirmedMedia>;

    /// Store the display order of confirmed items.
    async fn reorder_confirmed(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
        ordered: &[MediaId],
    ) -> RemoteResult<()>;

    /// Delete a confirmed item.
    async fn delete_media(&self, id: MediaId) -> RemoteResult<()>;

    /// Confirmed items for a resource and tag, in stored order.
    async fn list_media(&self, resource: &ResourceId, tag: MediaTag)
    -> RemoteResult<Vec<RemoteMedia>>;

    /// Add (`add = true`) or remove a resource from the caller's wishlist.
    async fn toggle_wishlist(&self, resource: &ResourceId, add: bool) -> RemoteResult<()>;

    /// Resource IDs currently on the caller's wishlist.
    async fn list_wishlist(&self) -> RemoteResult<Vec<ResourceId>>;

    /// Get the name of this backend.
    ///
    /// Used for logging.
    fn backend_name(&self) -> &'static str;
}
