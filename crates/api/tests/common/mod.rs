use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use roost_api::{MediaApi, RemoteError, RemoteResult};
use roost_core::{ConfirmedMedia, MediaId, MediaTag, RemoteMedia, ResourceId, UploadId, UploadSlot};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Scripted backend that records the order of protocol calls.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingApi {
    pub events: Mutex<Vec<String>>,
    pub slot_error: Option<RemoteError>,
    pub put_error: Option<RemoteError>,
    pub put_delay: Option<Duration>,
    pub confirm_error: Option<RemoteError>,
}

#[allow(dead_code)]
impl RecordingApi {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

#[async_trait]
impl MediaApi for RecordingApi {
    async fn request_upload_slot(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
        mime: &Mime,
    ) -> RemoteResult<UploadSlot> {
        self.record(format!("slot {resource} {tag} {}", mime.essence_str()));
        if let Some(err) = &self.slot_error {
            return Err(err.clone());
        }
        Ok(UploadSlot {
            upload_id: UploadId::new("up-1"),
            put_url: Url::parse("https://storage.test/put/up-1").unwrap(),
        })
    }

    async fn put_bytes(&self, put_url: &Url, bytes: Bytes, _mime: &Mime) -> RemoteResult<()> {
        self.record(format!("put {} {}", put_url.path(), bytes.len()));
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.put_error {
            return Err(err.clone());
        }
        Ok(())
    }

    async fn confirm_upload(&self, upload_id: &UploadId) -> RemoteResult<ConfirmedMedia> {
        self.record(format!("confirm {upload_id}"));
        if let Some(err) = &self.confirm_error {
            return Err(err.clone());
        }
        Ok(ConfirmedMedia {
            id: MediaId::new(41),
            url: Url::parse("https://cdn.test/media/41.jpg").unwrap(),
        })
    }

    async fn reorder_confirmed(
        &self,
        _resource: &ResourceId,
        _tag: MediaTag,
        _ordered: &[MediaId],
    ) -> RemoteResult<()> {
        Ok(())
    }

    async fn delete_media(&self, _id: MediaId) -> RemoteResult<()> {
        Ok(())
    }

    async fn list_media(
        &self,
        _resource: &ResourceId,
        _tag: MediaTag,
    ) -> RemoteResult<Vec<RemoteMedia>> {
        Ok(Vec::new())
    }

    async fn toggle_wishlist(&self, _resource: &ResourceId, _add: bool) -> RemoteResult<()> {
        Ok(())
    }

    async fn list_wishlist(&self) -> RemoteResult<Vec<ResourceId>> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
