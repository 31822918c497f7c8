//! Remote media API boundary for Roost.
//!
//! This crate provides:
//! - The [`MediaApi`] trait the pipeline consumes
//! - An HTTP backend speaking the marketplace JSON API
//! - Wire types, normalized into core types at the edge
//! - The three-phase [`UploadProtocolClient`]

pub mod error;
pub mod http;
pub mod protocol;
pub mod traits;
pub mod wire;

pub use error::{RemoteError, RemoteResult};
pub use http::HttpMediaApi;
pub use protocol::{ProtocolFailure, UploadProtocolClient};
pub use traits::MediaApi;

use roost_core::config::ApiConfig;
use std::sync::Arc;

/// Create a media API client from configuration.
pub fn from_config(config: &ApiConfig) -> RemoteResult<Arc<dyn MediaApi>> {
    let api = HttpMediaApi::from_config(config)?;
    tracing::debug!(base_url = %config.base_url, "Media API client configured");
    Ok(Arc::new(api))
}
