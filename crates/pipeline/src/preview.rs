//! Process-local previews for files that are still uploading.

use crate::error::{PipelineError, PipelineResult};
use bytes::Bytes;
use roost_core::{PreviewRef, UploadFile};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Memory-backed previews keyed by [`PreviewRef`].
///
/// Each reference is created once and revoked once. Cloning shares the
/// underlying store.
#[derive(Clone, Default)]
pub struct PreviewManager {
    previews: Arc<Mutex<HashMap<PreviewRef, Bytes>>>,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file`'s bytes and return a fresh reference to them.
    pub fn create(&self, file: &UploadFile) -> PreviewRef {
        let preview = PreviewRef::new();
        // Bytes is reference counted; this does not copy the payload.
        self.lock().insert(preview, file.bytes.clone());
        tracing::trace!(preview = %preview, file = %file.name, "Preview created");
        preview
    }

    /// Bytes behind a live preview.
    pub fn resolve(&self, preview: PreviewRef) -> Option<Bytes> {
        self.lock().get(&preview).cloned()
    }

    /// Release a preview. Revoking an unknown or already revoked reference is
    /// an error.
    pub fn revoke(&self, preview: PreviewRef) -> PipelineResult<()> {
        match self.lock().remove(&preview) {
            Some(_) => {
                tracing::trace!(preview = %preview, "Preview revoked");
                Ok(())
            }
            None => Err(PipelineError::Preview(format!(
                "{preview} is not a live preview"
            ))),
        }
    }

    /// Number of previews created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PreviewRef, Bytes>> {
        // A panic while holding this lock cannot leave the map half-updated.
        self.previews
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
