//! Pipeline error types.

use roost_api::{ProtocolFailure, RemoteError};
use roost_core::{MediaId, ResourceId, UploadPhase};
use thiserror::Error;

/// Errors surfaced by the upload pipeline and the wishlist store.
///
/// The per-file variants name the file they belong to and terminate only that
/// file's upload.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("{file}: unsupported file type {mime}")]
    InvalidFileType { file: String, mime: String },

    #[error("{file}: no free photo slot (capacity {capacity})")]
    CapacityExceeded { file: String, capacity: usize },

    #[error("{file}: not authorized to add photos: {message}")]
    Authorization { file: String, message: String },

    #[error("{file}: photo limit reached on the server: {message}")]
    Quota { file: String, message: String },

    #[error("{file}: upload failed while {phase}: {message}")]
    Transport {
        file: String,
        phase: UploadPhase,
        message: String,
    },

    #[error("{file}: upload could not be confirmed: {message}")]
    Confirmation { file: String, message: String },

    #[error("photo order could not be saved: {0}")]
    OrderSyncFailure(String),

    #[error("wishlist update for {resource} failed: {message}")]
    WishlistToggleFailure {
        resource: ResourceId,
        message: String,
    },

    #[error("photo {id} could not be deleted: {message}")]
    DeleteFailure { id: MediaId, message: String },

    #[error("cannot move photo from slot {from} to slot {to}")]
    IllegalReorder { from: usize, to: usize },

    #[error("slot {index} is still uploading")]
    SlotBusy { index: usize },

    #[error("slot {index} is empty")]
    EmptySlot { index: usize },

    #[error("slot {index} is out of range (capacity {capacity})")]
    SlotOutOfRange { index: usize, capacity: usize },

    #[error("preview error: {0}")]
    Preview(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Core(roost_core::Error),
}

impl PipelineError {
    /// Map a failed protocol run for `file` into the error taxonomy.
    pub fn from_protocol(file: &str, failure: ProtocolFailure) -> Self {
        let file = file.to_string();
        let message = failure.error.to_string();
        match (failure.phase, failure.error) {
            (_, RemoteError::Unauthorized(_)) => Self::Authorization { file, message },
            (_, RemoteError::Quota(_)) => Self::Quota { file, message },
            (_, RemoteError::Confirmation(_)) | (UploadPhase::Confirming, _) => {
                Self::Confirmation { file, message }
            }
            (phase, _) => Self::Transport {
                file,
                phase,
                message,
            },
        }
    }

    /// Transport failures may succeed on a fresh attempt; nothing else will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<roost_core::Error> for PipelineError {
    fn from(err: roost_core::Error) -> Self {
        match err {
            roost_core::Error::IllegalReorder { from, to } => Self::IllegalReorder { from, to },
            roost_core::Error::SlotBusy { index } => Self::SlotBusy { index },
            roost_core::Error::EmptySlot { index } => Self::EmptySlot { index },
            roost_core::Error::SlotOutOfRange { index, capacity } => {
                Self::SlotOutOfRange { index, capacity }
            }
            other => Self::Core(other),
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
