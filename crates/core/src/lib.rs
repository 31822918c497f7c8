//! Core domain types and shared logic for the Roost media pipeline.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Resource, media and upload identifiers
//! - Media items, locators and lifecycle states
//! - The fixed-capacity slot grid and its compaction rules
//! - The image file-type allow-list
//! - Client configuration

pub mod config;
pub mod error;
pub mod file_type;
pub mod grid;
pub mod media;
pub mod upload;

pub use error::{Error, Result};
pub use file_type::{ALLOWED_IMAGE_TYPES, is_allowed_image};
pub use grid::{Slot, SlotGrid, compact};
pub use media::{
    ConfirmedMedia, LifecycleState, Locator, MediaId, MediaItem, MediaTag, PreviewRef,
    RemoteMedia, ResourceId,
};
pub use upload::{CorrelationToken, UploadFile, UploadId, UploadPhase, UploadSlot};

/// Number of photo slots per resource and tag. Fixed business rule.
pub const GRID_CAPACITY: usize = 8;
