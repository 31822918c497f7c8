//! Upload pipeline for Roost listings.
//!
//! This crate wires the core grid and the remote API together:
//! - [`UploadOrchestrator`]: concurrent three-phase uploads into a slot grid,
//!   deletes and reorders
//! - [`OrderSyncService`]: best-effort push of the confirmed order
//! - [`PreviewManager`]: local previews while files upload
//! - [`WishlistStore`]: optimistic wishlist membership with exact rollback

pub mod cell;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod order_sync;
pub mod preview;
pub mod wishlist;

pub use cell::GridCell;
pub use error::{PipelineError, PipelineResult};
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use orchestrator::{FileOutcome, FileReport, PendingUploadHandle, UploadOrchestrator, UploadReport};
pub use order_sync::OrderSyncService;
pub use preview::PreviewManager;
pub use wishlist::{ToggleOutcome, WishlistStore};
