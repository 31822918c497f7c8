//! Best-effort push of the confirmed display order.

use crate::error::PipelineError;
use crate::notify::{Notice, Notifier};
use roost_api::MediaApi;
use roost_core::{MediaId, MediaTag, ResourceId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Pushes the confirmed order of one grid upstream.
///
/// Pushes run as background tasks, one at a time and in submission order. A
/// push that is superseded by a newer one before it starts is skipped, so the
/// last order sent is always the latest one submitted. Failures are logged and
/// reported as a notice; local state is never rolled back.
pub struct OrderSyncService {
    api: Arc<dyn MediaApi>,
    notifier: Arc<dyn Notifier>,
    resource: ResourceId,
    tag: MediaTag,
    /// Sequence number of the newest submitted push.
    latest: Arc<AtomicU64>,
    /// Serializes pushes.
    gate: Arc<tokio::sync::Mutex<()>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OrderSyncService {
    pub fn new(
        api: Arc<dyn MediaApi>,
        notifier: Arc<dyn Notifier>,
        resource: ResourceId,
        tag: MediaTag,
    ) -> Self {
        Self {
            api,
            notifier,
            resource,
            tag,
            latest: Arc::new(AtomicU64::new(0)),
            gate: Arc::new(tokio::sync::Mutex::new(())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Schedule a push of `ordered`. Returns `false` when nothing was
    /// scheduled: the list is empty or no runtime is available.
    pub fn push(&self, ordered: Vec<MediaId>) -> bool {
        if ordered.is_empty() {
            tracing::debug!(resource = %self.resource, tag = %self.tag, "No confirmed media, skipping order sync");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(resource = %self.resource, "Order sync requested outside a runtime");
            return false;
        };

        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let api = Arc::clone(&self.api);
        let notifier = Arc::clone(&self.notifier);
        let latest = Arc::clone(&self.latest);
        let gate = Arc::clone(&self.gate);
        let resource = self.resource.clone();
        let tag = self.tag;

        let handle = runtime.spawn(async move {
            let _turn = gate.lock().await;
            if latest.load(Ordering::SeqCst) != seq {
                tracing::debug!(resource = %resource, seq, "Order sync superseded");
                return;
            }
            match api.reorder_confirmed(&resource, tag, &ordered).await {
                Ok(()) => {
                    tracing::debug!(resource = %resource, tag = %tag, count = ordered.len(), "Order synced");
                }
                Err(e) => {
                    tracing::warn!(
                        resource = %resource,
                        tag = %tag,
                        backend = api.backend_name(),
                        error = %e,
                        "Order sync failed"
                    );
                    let err = PipelineError::OrderSyncFailure(e.to_string());
                    notifier.notify(Notice::warning(err.to_string()));
                }
            }
        });

        let mut tasks = self.lock_tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
        true
    }

    /// Wait for every scheduled push to finish.
    pub async fn flush(&self) {
        loop {
            let pending = std::mem::take(&mut *self.lock_tasks());
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(join_err) = handle.await
                    && join_err.is_panic()
                {
                    tracing::error!(resource = %self.resource, "Order sync task panicked");
                }
            }
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
