//! Three-phase upload protocol for a single file.
//!
//! 1. request an upload slot (upload ID + pre-authorized URL)
//! 2. PUT the bytes to that URL
//! 3. confirm the upload, receiving the media item
//!
//! Each phase starts only after the previous one resolved successfully. The
//! client holds no state between calls and never retries.

use crate::error::RemoteError;
use crate::traits::MediaApi;
use roost_core::{ConfirmedMedia, MediaTag, ResourceId, UploadFile, UploadPhase};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A protocol run that stopped at `phase`.
#[derive(Debug, Clone)]
pub struct ProtocolFailure {
    pub phase: UploadPhase,
    pub error: RemoteError,
}

impl fmt::Display for ProtocolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}

impl std::error::Error for ProtocolFailure {}

fn fail(phase: UploadPhase) -> impl FnOnce(RemoteError) -> ProtocolFailure {
    move |error| ProtocolFailure { phase, error }
}

#[derive(Clone)]
pub struct UploadProtocolClient {
    api: Arc<dyn MediaApi>,
    transfer_timeout: Option<Duration>,
}

impl UploadProtocolClient {
    pub fn new(api: Arc<dyn MediaApi>) -> Self {
        Self {
            api,
            transfer_timeout: None,
        }
    }

    /// Bound phase 2. A transfer exceeding `timeout` fails with [`RemoteError::Timeout`].
    pub fn with_transfer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Run all three phases for `file`.
    ///
    /// `on_phase` is called as each phase starts, before its network call.
    pub async fn upload<F>(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
        file: &UploadFile,
        mut on_phase: F,
    ) -> Result<ConfirmedMedia, ProtocolFailure>
    where
        F: FnMut(UploadPhase) + Send,
    {
        on_phase(UploadPhase::RequestingSlot);
        let slot = self
            .api
            .request_upload_slot(resource, tag, &file.mime)
            .await
            .map_err(fail(UploadPhase::RequestingSlot))?;

        tracing::debug!(
            upload_id = %slot.upload_id,
            file = %file.name,
            size = file.size(),
            "Upload slot granted"
        );

        on_phase(UploadPhase::Transferring);
        let transfer = self
            .api
            .put_bytes(&slot.put_url, file.bytes.clone(), &file.mime);
        let transferred = match self.transfer_timeout {
            Some(limit) => tokio::time::timeout(limit, transfer)
                .await
                .unwrap_or(Err(RemoteError::Timeout(limit))),
            None => transfer.await,
        };
        transferred.map_err(fail(UploadPhase::Transferring))?;

        on_phase(UploadPhase::Confirming);
        let media = self
            .api
            .confirm_upload(&slot.upload_id)
            .await
            .map_err(fail(UploadPhase::Confirming))?;

        tracing::debug!(
            upload_id = %slot.upload_id,
            media_id = %media.id,
            "Upload confirmed"
        );
        Ok(media)
    }
}
