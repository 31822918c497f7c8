//! Media items, identifiers and locators.

use crate::upload::CorrelationToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Identifier of the parent resource (a listing) that media is attached to.
///
/// Only URL-unreserved characters (`A-Z a-z 0-9 - _ . ~`) are accepted, so the
/// ID can be placed in a request path as is.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a resource ID, rejecting empty or path-breaking values.
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
        if id.is_empty() || id == "." || id == ".." || !id.chars().all(unreserved) {
            return Err(crate::Error::InvalidId(format!("invalid resource ID: {id:?}")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = crate::Error;

    fn try_from(id: String) -> crate::Result<Self> {
        Self::new(id)
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote identifier of a confirmed media item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(u64);

impl MediaId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaId({})", self.0)
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic tag a media item is registered under. Each tag has its own grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaTag {
    /// Photos of the property itself.
    Primary,
    /// Photos of the surrounding neighborhood.
    Secondary,
}

impl MediaTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for MediaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaTag {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => Err(crate::Error::InvalidId(format!("unknown media tag: {other}"))),
        }
    }
}

/// Handle to a process-local, memory-backed preview of a file.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewRef(Uuid);

impl PreviewRef {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PreviewRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreviewRef({})", self.0)
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:roost/{}", self.0)
    }
}

/// Where the bytes of a media item can be found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    /// Local preview, valid only until revoked.
    Preview(PreviewRef),
    /// Remote URL of a confirmed item.
    Remote(Url),
}

impl Locator {
    pub fn preview(&self) -> Option<PreviewRef> {
        match self {
            Self::Preview(preview) => Some(*preview),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preview(preview) => write!(f, "{preview}"),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Lifecycle of a media item held in a slot.
///
/// An empty slot is [`crate::Slot::Empty`], not a state of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Shown from a local preview; no network call has started yet.
    Previewing,
    /// Upload protocol in progress.
    Uploading,
    /// All three upload phases succeeded.
    Uploaded,
    /// Upload failed. Never survives compaction.
    Failed,
}

impl LifecycleState {
    /// Whether the item is still waiting on the network.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Previewing | Self::Uploading)
    }

    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Uploaded)
    }
}

/// A media item occupying one slot of a grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    /// Remote ID; `None` until confirmed.
    pub id: Option<MediaId>,
    pub locator: Locator,
    pub state: LifecycleState,
    /// Client-side token for pending items.
    pub token: Option<CorrelationToken>,
    /// Original file name for pending items, used in user-facing messages.
    pub file_name: Option<String>,
}

impl MediaItem {
    /// A placeholder shown while a file is being uploaded.
    pub fn placeholder(token: CorrelationToken, preview: PreviewRef, file_name: &str) -> Self {
        Self {
            id: None,
            locator: Locator::Preview(preview),
            state: LifecycleState::Previewing,
            token: Some(token),
            file_name: Some(file_name.to_string()),
        }
    }

    /// A confirmed item with a remote ID and URL.
    pub fn confirmed(id: MediaId, url: Url) -> Self {
        Self {
            id: Some(id),
            locator: Locator::Remote(url),
            state: LifecycleState::Uploaded,
            token: None,
            file_name: None,
        }
    }

    /// The same item in a different lifecycle state.
    pub fn with_state(&self, state: LifecycleState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state.is_confirmed() && self.id.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }
}

/// Result of a successful upload confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedMedia {
    pub id: MediaId,
    pub url: Url,
}

impl From<ConfirmedMedia> for MediaItem {
    fn from(media: ConfirmedMedia) -> Self {
        Self::confirmed(media.id, media.url)
    }
}

/// A confirmed item as listed by the backend, with its stored priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMedia {
    pub id: MediaId,
    pub url: Url,
    /// Position in the stored order; lower comes first.
    #[serde(default)]
    pub priority: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_validation() {
        assert!(ResourceId::new("listing-42").is_ok());
        assert!(ResourceId::new("").is_err());
        assert!(ResourceId::new("a/b").is_err());
        assert!(ResourceId::new("a b").is_err());
        assert_eq!(ResourceId::from(7).as_str(), "7");
        assert!(ResourceId::new("loft_2.v1~b").is_ok());
        for unsafe_id in ["42?x", "a#b", "50%25", "..", ".", "caf\u{e9}"] {
            assert!(ResourceId::new(unsafe_id).is_err(), "{unsafe_id:?}");
        }
    }

    #[test]
    fn test_resource_id_deserialization_is_validated() {
        let id: ResourceId = serde_json::from_str(r#""listing-3""#).unwrap();
        assert_eq!(id.as_str(), "listing-3");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""listing-3""#);
        assert!(serde_json::from_str::<ResourceId>(r#""3?x""#).is_err());
    }

    #[test]
    fn test_media_tag_parse_and_display() {
        assert_eq!("primary".parse::<MediaTag>().unwrap(), MediaTag::Primary);
        assert_eq!(MediaTag::Secondary.to_string(), "secondary");
        assert!("tertiary".parse::<MediaTag>().is_err());
    }

    #[test]
    fn test_placeholder_is_pending_without_id() {
        let preview = PreviewRef::new();
        let item = MediaItem::placeholder(CorrelationToken::new(), preview, "a.jpg");
        assert!(item.is_pending());
        assert!(!item.is_confirmed());
        assert_eq!(item.locator.preview(), Some(preview));
        assert!(item.locator.to_string().starts_with("blob:roost/"));

        let uploading = item.with_state(LifecycleState::Uploading);
        assert_eq!(uploading.token, item.token);
        assert!(uploading.is_pending());
    }

    #[test]
    fn test_remote_media_priority_defaults_to_zero() {
        let media: RemoteMedia =
            serde_json::from_str(r#"{"id": 3, "url": "https://cdn.example/3.jpg"}"#).unwrap();
        assert_eq!(media.id, MediaId::new(3));
        assert_eq!(media.priority, 0);
    }
}
