//! Optimistic wishlist membership.

use crate::error::{PipelineError, PipelineResult};
use crate::notify::{Notice, Notifier};
use roost_api::MediaApi;
use roost_core::ResourceId;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Result of a toggle whose remote call came back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The backend accepted the change; `member` is the new membership.
    Confirmed { member: bool },
    /// A newer toggle of the same resource started while this one was in
    /// flight. The response only updated the acknowledged membership.
    Superseded,
}

#[derive(Clone, Copy, Debug, Default)]
struct Entry {
    /// Displayed membership.
    member: bool,
    /// Membership the backend last acknowledged.
    confirmed: bool,
    /// Sequence number of the newest toggle in flight, if any.
    pending: Option<u64>,
}

/// Wishlist membership with optimistic toggles.
///
/// A toggle flips the displayed value immediately. If the newest toggle of a
/// resource fails, the display falls back to the membership the backend last
/// acknowledged (the value shown before the toggle, unless an older toggle was
/// still in flight) and a notice is sent. Responses to older toggles only
/// update the acknowledged value.
pub struct WishlistStore {
    api: Arc<dyn MediaApi>,
    notifier: Arc<dyn Notifier>,
    entries: Mutex<HashMap<ResourceId, Entry>>,
    seq: AtomicU64,
}

impl WishlistStore {
    pub fn new(api: Arc<dyn MediaApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            entries: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Displayed membership, including unconfirmed toggles.
    pub fn is_member(&self, resource: &ResourceId) -> bool {
        self.lock()
            .get(resource)
            .is_some_and(|entry| entry.member)
    }

    /// Whether a toggle of `resource` is awaiting the backend.
    pub fn is_pending(&self, resource: &ResourceId) -> bool {
        self.lock()
            .get(resource)
            .is_some_and(|entry| entry.pending.is_some())
    }

    /// Displayed members, sorted.
    pub fn members(&self) -> Vec<ResourceId> {
        let mut members: Vec<_> = self
            .lock()
            .iter()
            .filter(|(_, entry)| entry.member)
            .map(|(resource, _)| resource.clone())
            .collect();
        members.sort();
        members
    }

    /// Load membership from the backend. Entries with a toggle in flight keep
    /// their optimistic value.
    pub async fn hydrate(&self) -> PipelineResult<usize> {
        let listed = match self.api.list_wishlist().await {
            Ok(listed) => listed,
            Err(e) => {
                tracing::warn!(error = %e, "Wishlist load failed");
                self.notifier
                    .notify(Notice::warning(format!("wishlist could not be loaded: {e}")));
                return Err(e.into());
            }
        };

        let listed: HashSet<ResourceId> = listed.into_iter().collect();
        let mut entries = self.lock();
        for (resource, entry) in entries.iter_mut() {
            entry.confirmed = listed.contains(resource);
            if entry.pending.is_none() {
                entry.member = entry.confirmed;
            }
        }
        for resource in &listed {
            entries.entry(resource.clone()).or_insert(Entry {
                member: true,
                confirmed: true,
                pending: None,
            });
        }
        tracing::debug!(count = listed.len(), "Wishlist loaded");
        Ok(listed.len())
    }

    /// Flip membership of `resource` now, then confirm with the backend.
    pub async fn toggle(&self, resource: &ResourceId) -> PipelineResult<ToggleOutcome> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let target = {
            let mut entries = self.lock();
            let entry = entries.entry(resource.clone()).or_default();
            entry.member = !entry.member;
            entry.pending = Some(seq);
            entry.member
        };

        let result = self.api.toggle_wishlist(resource, target).await;

        {
            let mut entries = self.lock();
            let entry = entries.entry(resource.clone()).or_default();
            if result.is_ok() {
                entry.confirmed = target;
            }
            if entry.pending != Some(seq) {
                // Newest toggle already settled: follow late acknowledgements.
                if entry.pending.is_none() {
                    entry.member = entry.confirmed;
                }
                tracing::debug!(resource = %resource, seq, "Superseded wishlist response");
                return Ok(ToggleOutcome::Superseded);
            }
            entry.pending = None;
            if result.is_err() {
                entry.member = entry.confirmed;
            }
        }

        match result {
            Ok(()) => {
                tracing::debug!(resource = %resource, member = target, "Wishlist updated");
                Ok(ToggleOutcome::Confirmed { member: target })
            }
            Err(e) => {
                let err = PipelineError::WishlistToggleFailure {
                    resource: resource.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(resource = %resource, error = %e, "Wishlist toggle rolled back");
                self.notifier.notify(Notice::warning(err.to_string()));
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceId, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
