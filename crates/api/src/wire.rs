//! Request/response types exchanged with the backend.
//!
//! Responses are normalized into core types here, once, so nothing past this
//! module branches on payload shape.

use crate::error::{RemoteError, RemoteResult};
use roost_core::{ConfirmedMedia, MediaId, MediaTag, RemoteMedia, ResourceId, UploadId, UploadSlot};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize)]
pub struct RequestUploadSlotRequest<'a> {
    pub tag: MediaTag,
    pub mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct UploadSlotResponse {
    pub upload_id: String,
    pub put_url: String,
}

impl UploadSlotResponse {
    pub fn into_slot(self) -> RemoteResult<UploadSlot> {
        if self.upload_id.is_empty() {
            return Err(RemoteError::Decode("empty upload_id".to_string()));
        }
        let put_url = Url::parse(&self.put_url)
            .map_err(|e| RemoteError::Decode(format!("invalid put_url: {e}")))?;
        Ok(UploadSlot {
            upload_id: UploadId::new(self.upload_id),
            put_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmUploadResponse {
    pub id: u64,
    pub url: String,
}

impl ConfirmUploadResponse {
    pub fn into_media(self) -> RemoteResult<ConfirmedMedia> {
        let url =
            Url::parse(&self.url).map_err(|e| RemoteError::Decode(format!("invalid url: {e}")))?;
        Ok(ConfirmedMedia {
            id: MediaId::new(self.id),
            url,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderedId {
    pub id: MediaId,
}

#[derive(Debug, Serialize)]
pub struct ReorderRequest {
    pub tag: MediaTag,
    pub ordered_ids: Vec<OrderedId>,
}

impl ReorderRequest {
    pub fn new(tag: MediaTag, ids: &[MediaId]) -> Self {
        Self {
            tag,
            ordered_ids: ids.iter().map(|id| OrderedId { id: *id }).collect(),
        }
    }
}

/// Media listing, either a bare array or wrapped in `{"media": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MediaListResponse {
    List(Vec<RemoteMedia>),
    Wrapped { media: Vec<RemoteMedia> },
}

impl MediaListResponse {
    /// Items ordered by stored priority, ties broken by ID.
    pub fn into_ordered(self) -> Vec<RemoteMedia> {
        let mut items = match self {
            Self::List(items) | Self::Wrapped { media: items } => items,
        };
        items.sort_by_key(|item| (item.priority, item.id));
        items
    }
}

/// A resource ID as the backend sends it: number or string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireResourceId {
    Number(u64),
    Text(String),
}

impl WireResourceId {
    fn into_resource_id(self) -> RemoteResult<ResourceId> {
        match self {
            Self::Number(id) => Ok(ResourceId::from(id)),
            Self::Text(id) => ResourceId::new(id).map_err(|e| RemoteError::Decode(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingRef {
    pub id: WireResourceId,
}

/// Wishlist listing. The backend answers with a bare ID array, an array of
/// listing objects, or listings split into `active` and `inactive` (at least
/// one side present).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WishlistListing {
    Ids(Vec<WireResourceId>),
    Listings(Vec<ListingRef>),
    Partitioned {
        #[serde(default)]
        active: Option<Vec<ListingRef>>,
        #[serde(default)]
        inactive: Option<Vec<ListingRef>>,
    },
}

impl WishlistListing {
    /// Flatten to resource IDs, active listings first.
    pub fn into_resource_ids(self) -> RemoteResult<Vec<ResourceId>> {
        let wire: Vec<WireResourceId> = match self {
            Self::Ids(ids) => ids,
            Self::Listings(listings) => listings.into_iter().map(|l| l.id).collect(),
            Self::Partitioned {
                active: None,
                inactive: None,
            } => {
                return Err(RemoteError::Decode(
                    "wishlist response has neither active nor inactive listings".to_string(),
                ));
            }
            Self::Partitioned { active, inactive } => active
                .into_iter()
                .flatten()
                .chain(inactive.into_iter().flatten())
                .map(|l| l.id)
                .collect(),
        };
        wire.into_iter()
            .map(WireResourceId::into_resource_id)
            .collect()
    }
}
