//! Upload orchestration for one resource and tag.
//!
//! Files submitted together are admitted in order (type check, capacity check,
//! preview, placeholder) and then run as independent three-phase uploads.
//! Each outcome finds its slot by correlation token, never by the index it
//! was inserted at, because compaction and deletes move items while uploads
//! are in flight.

use crate::cell::GridCell;
use crate::error::{PipelineError, PipelineResult};
use crate::notify::{Notice, Notifier};
use crate::order_sync::OrderSyncService;
use crate::preview::PreviewManager;
use futures::future::join_all;
use roost_api::{MediaApi, UploadProtocolClient};
use roost_core::config::UploadConfig;
use roost_core::{
    ConfirmedMedia, CorrelationToken, GRID_CAPACITY, LifecycleState, MediaId, MediaItem, MediaTag,
    PreviewRef, RemoteMedia, ResourceId, Slot, SlotGrid, UploadFile, UploadPhase,
    is_allowed_image,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// An admitted file whose upload has not finished yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingUploadHandle {
    pub token: CorrelationToken,
    /// Slot the placeholder was inserted at. Informational only; the slot may
    /// have moved since.
    pub slot_index: usize,
    pub preview: PreviewRef,
    pub file_name: String,
    pub tag: MediaTag,
    pub phase: UploadPhase,
    pub attempt: u32,
}

/// How one submitted file ended.
#[derive(Debug)]
pub enum FileOutcome {
    /// All three phases succeeded and the item took its slot.
    Uploaded { id: MediaId },
    /// Rejected at admission. No preview was created and no network call made.
    Rejected(PipelineError),
    /// Admitted, then failed. Its placeholder and preview are gone.
    Failed(PipelineError),
    /// Finished after the grid was replaced; the outcome was dropped.
    Discarded,
}

#[derive(Debug)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: FileOutcome,
}

/// Per-file outcomes of one [`UploadOrchestrator::upload_files`] call, in
/// submission order.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub files: Vec<FileReport>,
}

impl UploadReport {
    pub fn uploaded(&self) -> Vec<MediaId> {
        self.files
            .iter()
            .filter_map(|report| match report.outcome {
                FileOutcome::Uploaded { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &PipelineError> {
        self.files.iter().filter_map(|report| match &report.outcome {
            FileOutcome::Rejected(err) | FileOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn all_uploaded(&self) -> bool {
        self.files
            .iter()
            .all(|report| matches!(report.outcome, FileOutcome::Uploaded { .. }))
    }
}

/// Coordinates uploads, deletes and reorders against one grid.
///
/// Cheap to clone; clones share the grid, the in-flight table and the order
/// sync queue.
#[derive(Clone)]
pub struct UploadOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    resource: ResourceId,
    tag: MediaTag,
    api: Arc<dyn MediaApi>,
    protocol: UploadProtocolClient,
    previews: PreviewManager,
    notifier: Arc<dyn Notifier>,
    order_sync: OrderSyncService,
    grid: GridCell,
    in_flight: Mutex<HashMap<CorrelationToken, PendingUploadHandle>>,
    config: UploadConfig,
}

impl UploadOrchestrator {
    pub fn new(
        resource: ResourceId,
        tag: MediaTag,
        api: Arc<dyn MediaApi>,
        notifier: Arc<dyn Notifier>,
        config: &UploadConfig,
    ) -> Self {
        let protocol = UploadProtocolClient::new(Arc::clone(&api))
            .with_transfer_timeout(config.transfer_timeout());
        let order_sync = OrderSyncService::new(
            Arc::clone(&api),
            Arc::clone(&notifier),
            resource.clone(),
            tag,
        );
        Self {
            inner: Arc::new(Inner {
                resource,
                tag,
                api,
                protocol,
                previews: PreviewManager::new(),
                notifier,
                order_sync,
                grid: GridCell::new(SlotGrid::new()),
                in_flight: Mutex::new(HashMap::new()),
                config: config.clone(),
            }),
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.inner.resource
    }

    pub fn tag(&self) -> MediaTag {
        self.inner.tag
    }

    /// Snapshot of the current grid.
    pub fn grid(&self) -> SlotGrid {
        self.inner.grid.snapshot()
    }

    /// Receiver woken on every grid change.
    pub fn subscribe(&self) -> watch::Receiver<SlotGrid> {
        self.inner.grid.subscribe()
    }

    pub fn previews(&self) -> &PreviewManager {
        &self.inner.previews
    }

    /// Uploads admitted and not yet finished, by slot index.
    pub fn in_flight(&self) -> Vec<PendingUploadHandle> {
        let mut handles: Vec<_> = self.inner.lock_in_flight().values().cloned().collect();
        handles.sort_by_key(|handle| handle.slot_index);
        handles
    }

    /// Replace the grid with the confirmed items of a remote listing.
    ///
    /// Outstanding uploads lose their slots; their outcomes are discarded when
    /// they arrive. Does not push an order.
    pub fn hydrate(&self, listed: Vec<RemoteMedia>) -> PipelineResult<usize> {
        if listed.len() > GRID_CAPACITY {
            tracing::warn!(
                resource = %self.inner.resource,
                tag = %self.inner.tag,
                listed = listed.len(),
                capacity = GRID_CAPACITY,
                "Remote listing exceeds grid capacity, ignoring the excess"
            );
        }
        let items = listed
            .into_iter()
            .map(|media| MediaItem::confirmed(media.id, media.url));
        let grid = SlotGrid::hydrate(GRID_CAPACITY, items)?;
        let count = grid.confirmed_count();
        self.inner.grid.replace(grid);
        Ok(count)
    }

    /// Fetch the stored listing and [`hydrate`](Self::hydrate) from it.
    pub async fn reload(&self) -> PipelineResult<usize> {
        let listed = self
            .inner
            .api
            .list_media(&self.inner.resource, self.inner.tag)
            .await?;
        let count = self.hydrate(listed)?;
        tracing::info!(resource = %self.inner.resource, tag = %self.inner.tag, count, "Grid loaded");
        Ok(count)
    }

    /// Drop the current grid for an empty one (navigation away).
    pub fn reset(&self) {
        self.inner.grid.replace(SlotGrid::new());
    }

    /// Upload `files` concurrently. Returns once every file reached a
    /// terminal outcome.
    ///
    /// Each confirmation pushes the new order as soon as it lands; pushes that
    /// land together coalesce into one.
    pub async fn upload_files(&self, files: Vec<UploadFile>) -> UploadReport {
        let inner = &self.inner;
        let submitted = files.len();
        let mut reports: Vec<Option<FileReport>> = Vec::with_capacity(submitted);
        let mut admitted = Vec::new();

        for file in files {
            match inner.admit(&file) {
                Ok((token, preview)) => {
                    admitted.push((reports.len(), token, preview, file));
                    reports.push(None);
                }
                Err(err) => {
                    inner.notifier.notify(Notice::error(err.to_string()));
                    reports.push(Some(FileReport {
                        file_name: file.name,
                        outcome: FileOutcome::Rejected(err),
                    }));
                }
            }
        }

        tracing::info!(
            resource = %inner.resource,
            tag = %inner.tag,
            submitted,
            admitted = admitted.len(),
            "Upload batch started"
        );

        let runs = admitted
            .into_iter()
            .map(|(position, token, preview, file)| async move {
                (position, inner.run(token, preview, file).await)
            });
        for (position, report) in join_all(runs).await {
            reports[position] = Some(report);
        }

        UploadReport {
            files: reports.into_iter().flatten().collect(),
        }
    }

    /// Delete the confirmed item at `index`.
    ///
    /// The remote delete runs first; the grid only changes once it succeeded.
    pub async fn delete_at(&self, index: usize) -> PipelineResult<MediaId> {
        let inner = &self.inner;
        let grid = inner.grid.snapshot();
        let slot = grid.get(index).ok_or(PipelineError::SlotOutOfRange {
            index,
            capacity: grid.capacity(),
        })?;
        let id = match slot {
            Slot::Empty => return Err(PipelineError::EmptySlot { index }),
            Slot::Filled(item) => match item.id {
                Some(id) if item.is_confirmed() => id,
                _ => return Err(PipelineError::SlotBusy { index }),
            },
        };

        if let Err(e) = inner.api.delete_media(id).await {
            tracing::warn!(media_id = %id, error = %e, "Media delete failed");
            return Err(PipelineError::DeleteFailure {
                id,
                message: e.to_string(),
            });
        }

        // The grid may have moved on while the delete was in flight.
        if inner
            .grid
            .update(|grid| grid.without_media(id).map(|next| (next, ())))
            .is_some()
        {
            inner.push_order();
        }
        tracing::info!(resource = %inner.resource, media_id = %id, "Media deleted");
        Ok(id)
    }

    /// Move the confirmed item at `from` to `to`, shifting the ones between.
    pub fn reorder(&self, from: usize, to: usize) -> PipelineResult<()> {
        let mut outcome: PipelineResult<bool> = Ok(false);
        self.inner.grid.update(|grid| match grid.moved(from, to) {
            Ok(_) if from == to => None,
            Ok(next) => {
                outcome = Ok(true);
                Some((next, ()))
            }
            Err(e) => {
                outcome = Err(e.into());
                None
            }
        });
        if outcome? {
            tracing::debug!(resource = %self.inner.resource, from, to, "Media reordered");
            self.inner.push_order();
        }
        Ok(())
    }

    /// Wait for scheduled order pushes to finish.
    pub async fn flush_order_sync(&self) {
        self.inner.order_sync.flush().await;
    }
}

impl Inner {
    /// Type check, then capacity check, then preview and placeholder.
    fn admit(&self, file: &UploadFile) -> PipelineResult<(CorrelationToken, PreviewRef)> {
        if !is_allowed_image(&file.mime) {
            return Err(PipelineError::InvalidFileType {
                file: file.name.clone(),
                mime: file.mime.to_string(),
            });
        }

        let token = CorrelationToken::new();
        let admitted = self.grid.update(|grid| {
            grid.first_empty()?;
            let preview = self.previews.create(file);
            let placeholder = MediaItem::placeholder(token, preview, &file.name);
            let (next, index) = grid.inserted(placeholder).ok()?;
            Some((next, (index, preview)))
        });
        let Some((slot_index, preview)) = admitted else {
            return Err(PipelineError::CapacityExceeded {
                file: file.name.clone(),
                capacity: GRID_CAPACITY,
            });
        };

        self.lock_in_flight().insert(
            token,
            PendingUploadHandle {
                token,
                slot_index,
                preview,
                file_name: file.name.clone(),
                tag: self.tag,
                phase: UploadPhase::Queued,
                attempt: 1,
            },
        );
        self.advance(token, UploadPhase::Previewing);
        tracing::debug!(file = %file.name, token = %token, slot = slot_index, "Placeholder inserted");
        Ok((token, preview))
    }

    /// Run the protocol for one admitted file, retrying transport failures
    /// from phase one while attempts remain.
    async fn run(&self, token: CorrelationToken, preview: PreviewRef, file: UploadFile) -> FileReport {
        let mut attempt = 1;
        loop {
            let result = self
                .protocol
                .upload(&self.resource, self.tag, &file, |phase| {
                    self.on_phase(token, phase)
                })
                .await;

            match result {
                Ok(media) => return self.complete(token, preview, file.name, media),
                Err(failure) => {
                    let err = PipelineError::from_protocol(&file.name, failure);
                    if err.is_retryable()
                        && attempt < self.config.max_attempts
                        && self.grid.snapshot().find_by_token(token).is_some()
                    {
                        let delay = self.config.retry_delay(attempt);
                        tracing::warn!(
                            file = %file.name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Upload attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        if let Some(handle) = self.lock_in_flight().get_mut(&token) {
                            handle.attempt = attempt;
                        }
                        continue;
                    }
                    return self.fail(token, preview, file.name, err);
                }
            }
        }
    }

    fn on_phase(&self, token: CorrelationToken, phase: UploadPhase) {
        self.advance(token, phase);
        if phase == UploadPhase::RequestingSlot {
            self.grid.update(|grid| {
                grid.with_state(token, LifecycleState::Uploading)
                    .map(|next| (next, ()))
            });
        }
        tracing::trace!(token = %token, phase = %phase, "Upload phase");
    }

    fn complete(
        &self,
        token: CorrelationToken,
        preview: PreviewRef,
        file_name: String,
        media: ConfirmedMedia,
    ) -> FileReport {
        self.finish(token, UploadPhase::Done);
        let id = media.id;
        let item = MediaItem::from(media);

        let applied = self.grid.update(|grid| {
            grid.replaced(token, item)
                .map(|next| (next.compacted(), ()))
        });
        self.release(preview);

        if applied.is_none() {
            tracing::debug!(file = %file_name, media_id = %id, "Grid replaced, discarding upload outcome");
            return FileReport {
                file_name,
                outcome: FileOutcome::Discarded,
            };
        }

        tracing::info!(resource = %self.resource, file = %file_name, media_id = %id, "Upload complete");
        self.push_order();
        FileReport {
            file_name,
            outcome: FileOutcome::Uploaded { id },
        }
    }

    fn fail(
        &self,
        token: CorrelationToken,
        preview: PreviewRef,
        file_name: String,
        err: PipelineError,
    ) -> FileReport {
        self.finish(token, UploadPhase::Failed);
        let removed = self
            .grid
            .update(|grid| grid.failed(token).map(|next| (next, ())));
        self.release(preview);

        if removed.is_none() {
            tracing::debug!(file = %file_name, error = %err, "Grid replaced, discarding upload failure");
            return FileReport {
                file_name,
                outcome: FileOutcome::Discarded,
            };
        }

        tracing::warn!(resource = %self.resource, file = %file_name, error = %err, "Upload failed");
        self.notifier.notify(Notice::error(err.to_string()));
        FileReport {
            file_name,
            outcome: FileOutcome::Failed(err),
        }
    }

    /// Move the handle of `token` to `next` if the transition is legal.
    fn advance(&self, token: CorrelationToken, next: UploadPhase) {
        let mut in_flight = self.lock_in_flight();
        let Some(handle) = in_flight.get_mut(&token) else {
            return;
        };
        if !handle.phase.can_advance_to(next) {
            tracing::warn!(
                file = %handle.file_name,
                from = %handle.phase,
                to = %next,
                "Illegal upload phase transition ignored"
            );
            return;
        }
        handle.phase = next;
    }

    /// Record the terminal phase of `token` and drop its handle.
    fn finish(&self, token: CorrelationToken, phase: UploadPhase) {
        debug_assert!(phase.is_terminal());
        self.advance(token, phase);
        if let Some(handle) = self.lock_in_flight().remove(&token) {
            tracing::debug!(
                file = %handle.file_name,
                attempts = handle.attempt,
                phase = %handle.phase,
                "Upload settled"
            );
        }
    }

    fn release(&self, preview: PreviewRef) {
        if let Err(e) = self.previews.revoke(preview) {
            tracing::warn!(error = %e, "Preview release failed");
        }
    }

    fn push_order(&self) {
        let ordered = self.grid.snapshot().confirmed_ids();
        self.order_sync.push(ordered);
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<CorrelationToken, PendingUploadHandle>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
