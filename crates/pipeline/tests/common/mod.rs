use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use roost_api::{MediaApi, RemoteError, RemoteResult};
use roost_core::config::UploadConfig;
use roost_core::{
    ConfirmedMedia, MediaId, MediaTag, RemoteMedia, ResourceId, SlotGrid, UploadFile, UploadId,
    UploadSlot,
};
use roost_pipeline::{Notice, Notifier, UploadOrchestrator};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// One scripted wishlist response.
#[allow(dead_code)]
#[derive(Default)]
pub struct WishlistStep {
    pub gate: Option<Arc<Notify>>,
    pub error: Option<RemoteError>,
}

/// In-memory backend with call counters, scripted failures and gates.
///
/// Files are identified by their bytes: tests build files whose content is
/// their name, so scripting is keyed by file name.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockMediaApi {
    pub slot_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    next_upload: AtomicU64,
    next_media: AtomicU64,

    slot_error: Mutex<Option<RemoteError>>,
    put_failures: Mutex<HashMap<String, VecDeque<RemoteError>>>,
    confirm_errors: Mutex<HashMap<String, RemoteError>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    uploads: Mutex<HashMap<String, String>>,
    media_ids: Mutex<HashMap<String, MediaId>>,

    reorders: Mutex<Vec<Vec<MediaId>>>,
    reorder_failures: Mutex<VecDeque<RemoteError>>,
    reorder_gate: Mutex<Option<Arc<Notify>>>,
    deletes: Mutex<Vec<MediaId>>,
    delete_error: Mutex<Option<RemoteError>>,
    listing: Mutex<Vec<RemoteMedia>>,

    wishlist_calls: Mutex<Vec<(ResourceId, bool)>>,
    wishlist_steps: Mutex<VecDeque<WishlistStep>>,
    wishlist: Mutex<Vec<ResourceId>>,
}

#[allow(dead_code)]
impl MockMediaApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_media: AtomicU64::new(100),
            ..Self::default()
        })
    }

    pub fn fail_slot_requests(&self, error: RemoteError) {
        *self.slot_error.lock().unwrap() = Some(error);
    }

    /// Fail the next transfer of `file` with `error`. Queues up.
    pub fn fail_put(&self, file: &str, error: RemoteError) {
        self.put_failures
            .lock()
            .unwrap()
            .entry(file.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn fail_confirm(&self, file: &str, error: RemoteError) {
        self.confirm_errors
            .lock()
            .unwrap()
            .insert(file.to_string(), error);
    }

    /// Hold the transfer of `file` until the returned gate is notified.
    pub fn gate(&self, file: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(file.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn gate_next_reorder(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.reorder_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Whether a gated reorder call has reached the backend.
    pub fn reorder_started(&self) -> bool {
        self.reorder_gate.lock().unwrap().is_none()
    }

    pub fn fail_next_reorder(&self, error: RemoteError) {
        self.reorder_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_deletes(&self, error: RemoteError) {
        *self.delete_error.lock().unwrap() = Some(error);
    }

    pub fn set_listing(&self, listing: Vec<RemoteMedia>) {
        *self.listing.lock().unwrap() = listing;
    }

    pub fn set_wishlist(&self, ids: Vec<ResourceId>) {
        *self.wishlist.lock().unwrap() = ids;
    }

    pub fn script_wishlist(&self, step: WishlistStep) {
        self.wishlist_steps.lock().unwrap().push_back(step);
    }

    /// Media ID the backend assigned to `file`.
    pub fn id_of(&self, file: &str) -> MediaId {
        self.media_ids.lock().unwrap()[file]
    }

    pub fn reorders(&self) -> Vec<Vec<MediaId>> {
        self.reorders.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<MediaId> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn wishlist_calls(&self) -> Vec<(ResourceId, bool)> {
        self.wishlist_calls.lock().unwrap().clone()
    }

    fn upload_id_from(url: &Url) -> String {
        url.path().rsplit('/').next().unwrap_or_default().to_string()
    }
}

#[async_trait]
impl MediaApi for MockMediaApi {
    async fn request_upload_slot(
        &self,
        _resource: &ResourceId,
        _tag: MediaTag,
        _mime: &Mime,
    ) -> RemoteResult<UploadSlot> {
        self.slot_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.slot_error.lock().unwrap().clone() {
            return Err(err);
        }
        let n = self.next_upload.fetch_add(1, Ordering::SeqCst) + 1;
        let upload_id = format!("up-{n}");
        Ok(UploadSlot {
            put_url: Url::parse(&format!("https://storage.test/put/{upload_id}")).unwrap(),
            upload_id: UploadId::new(upload_id),
        })
    }

    async fn put_bytes(&self, put_url: &Url, bytes: Bytes, _mime: &Mime) -> RemoteResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let file = String::from_utf8_lossy(&bytes).to_string();

        let gate = self.gates.lock().unwrap().get(&file).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = self
            .put_failures
            .lock()
            .unwrap()
            .get_mut(&file)
            .and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }

        self.uploads
            .lock()
            .unwrap()
            .insert(Self::upload_id_from(put_url), file);
        Ok(())
    }

    async fn confirm_upload(&self, upload_id: &UploadId) -> RemoteResult<ConfirmedMedia> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        let file = self
            .uploads
            .lock()
            .unwrap()
            .get(upload_id.as_str())
            .cloned()
            .ok_or_else(|| RemoteError::Confirmation("no bytes observed".to_string()))?;
        if let Some(err) = self.confirm_errors.lock().unwrap().get(&file).cloned() {
            return Err(err);
        }

        let id = MediaId::new(self.next_media.fetch_add(1, Ordering::SeqCst));
        self.media_ids.lock().unwrap().insert(file, id);
        Ok(ConfirmedMedia {
            id,
            url: Url::parse(&format!("https://cdn.test/media/{id}.jpg")).unwrap(),
        })
    }

    async fn reorder_confirmed(
        &self,
        _resource: &ResourceId,
        _tag: MediaTag,
        ordered: &[MediaId],
    ) -> RemoteResult<()> {
        let gate = self.reorder_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.reorders.lock().unwrap().push(ordered.to_vec());
        match self.reorder_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn delete_media(&self, id: MediaId) -> RemoteResult<()> {
        if let Some(err) = self.delete_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.deletes.lock().unwrap().push(id);
        Ok(())
    }

    async fn list_media(
        &self,
        _resource: &ResourceId,
        _tag: MediaTag,
    ) -> RemoteResult<Vec<RemoteMedia>> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn toggle_wishlist(&self, resource: &ResourceId, add: bool) -> RemoteResult<()> {
        self.wishlist_calls
            .lock()
            .unwrap()
            .push((resource.clone(), add));
        let step = self
            .wishlist_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        match step.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list_wishlist(&self) -> RemoteResult<Vec<ResourceId>> {
        Ok(self.wishlist.lock().unwrap().clone())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// Notifier that keeps every notice.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A JPEG whose bytes are its own name.
#[allow(dead_code)]
pub fn photo(name: &str) -> UploadFile {
    UploadFile::new(name, mime::IMAGE_JPEG, Bytes::from(name.to_string()))
}

#[allow(dead_code)]
pub fn remote(id: u64, priority: u32) -> RemoteMedia {
    RemoteMedia {
        id: MediaId::new(id),
        url: Url::parse(&format!("https://cdn.test/media/{id}.jpg")).unwrap(),
        priority,
    }
}

/// `count` confirmed items with IDs 1..=count, in order.
#[allow(dead_code)]
pub fn listing(count: u64) -> Vec<RemoteMedia> {
    (1..=count).map(|id| remote(id, id as u32)).collect()
}

#[allow(dead_code)]
pub fn test_config() -> UploadConfig {
    UploadConfig {
        transfer_timeout_secs: 0,
        max_attempts: 1,
        retry_base_delay_ms: 1,
    }
}

#[allow(dead_code)]
pub fn orchestrator_with(
    api: &Arc<MockMediaApi>,
    config: &UploadConfig,
) -> (UploadOrchestrator, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = UploadOrchestrator::new(
        ResourceId::new("listing-1").unwrap(),
        MediaTag::Primary,
        Arc::clone(api) as Arc<dyn MediaApi>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        config,
    );
    (orchestrator, notifier)
}

#[allow(dead_code)]
pub fn orchestrator(api: &Arc<MockMediaApi>) -> (UploadOrchestrator, Arc<RecordingNotifier>) {
    orchestrator_with(api, &test_config())
}

/// Wait until `pred` holds.
#[allow(dead_code)]
pub async fn wait_until(pred: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !pred() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Wait until the orchestrator's grid satisfies `pred`.
#[allow(dead_code)]
pub async fn wait_for_grid(orchestrator: &UploadOrchestrator, pred: impl Fn(&SlotGrid) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(&orchestrator.grid()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("grid never reached the expected state");
}
