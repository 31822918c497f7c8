//! Upload identifiers, files and per-file lifecycle.

use bytes::Bytes;
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Client-generated token matching an asynchronous upload outcome to its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Generate a new random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationToken({})", self.0)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-issued identifier of a pending upload (phase 1 result).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadId({})", self.0)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pre-authorized destination for the bytes of one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSlot {
    pub upload_id: UploadId,
    pub put_url: Url,
}

/// A file selected by the user for upload.
#[derive(Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime: Mime,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: Mime, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime", &self.mime.essence_str())
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Per-file upload state machine.
///
/// `Queued -> Previewing -> RequestingSlot -> Transferring -> Confirming -> Done`,
/// or `Failed` from any of the three network phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Queued,
    Previewing,
    RequestingSlot,
    Transferring,
    Confirming,
    Done,
    Failed,
}

impl UploadPhase {
    /// Check if the phase waits on a network call.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::RequestingSlot | Self::Transferring | Self::Confirming
        )
    }

    /// Check if the upload reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(&self, next: UploadPhase) -> bool {
        use UploadPhase::*;
        match (self, next) {
            (Queued, Previewing)
            | (Previewing, RequestingSlot)
            | (RequestingSlot, Transferring)
            | (Transferring, Confirming)
            | (Confirming, Done) => true,
            // A retry starts over from phase 1.
            (RequestingSlot | Transferring | Confirming, RequestingSlot) => true,
            (current, Failed) => current.is_network(),
            _ => false,
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Previewing => "previewing",
            Self::RequestingSlot => "requesting slot",
            Self::Transferring => "transferring",
            Self::Confirming => "confirming",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
