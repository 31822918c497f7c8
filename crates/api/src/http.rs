//! HTTP implementation of [`MediaApi`].

use crate::error::{RemoteError, RemoteResult};
use crate::traits::MediaApi;
use crate::wire::{
    ConfirmUploadResponse, MediaListResponse, ReorderRequest, RequestUploadSlotRequest,
    UploadSlotResponse, WishlistListing,
};
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use roost_core::config::ApiConfig;
use roost_core::{ConfirmedMedia, MediaId, MediaTag, RemoteMedia, ResourceId, UploadId, UploadSlot};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Which call a response belongs to; decides how error statuses are read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Call {
    RequestSlot,
    Put,
    Confirm,
    Other,
}

fn classify(call: Call, status: StatusCode, body: String) -> RemoteError {
    match (call, status.as_u16()) {
        (Call::Put, code) if code == 401 || code == 403 => {
            RemoteError::Transport(format!("upload URL rejected ({status}): {body}"))
        }
        (_, 401 | 403) => RemoteError::Unauthorized(body),
        (Call::RequestSlot, 409 | 422 | 429) => RemoteError::Quota(body),
        (Call::Confirm, 404 | 409 | 410 | 422) => RemoteError::Confirmation(body),
        (Call::Put, _) => RemoteError::Transport(format!("upload failed ({status}): {body}")),
        (_, 404) => RemoteError::NotFound(body),
        (_, code) => RemoteError::Api { status: code, body },
    }
}

/// Marketplace backend reached over HTTP with bearer-token auth.
#[derive(Clone)]
pub struct HttpMediaApi {
    http: reqwest::Client,
    transfer: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpMediaApi {
    pub fn new(base_url: &str, token: Option<&str>, request_timeout: Duration) -> RemoteResult<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to build HTTP client: {e}")))?;
        // Transfers are bounded by the upload protocol, not by the client.
        let transfer = reqwest::Client::builder()
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            transfer,
            base_url,
            token: token.map(str::to_string),
        })
    }

    pub fn from_config(config: &ApiConfig) -> RemoteResult<Self> {
        config.validate().map_err(RemoteError::Config)?;
        Self::new(
            &config.base_url,
            config.token.as_deref(),
            config.request_timeout(),
        )
    }

    fn url(&self, path: &str) -> RemoteResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, call: Call, req: reqwest::RequestBuilder) -> RemoteResult<String> {
        let response = self.authorized(req).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify(call, status, body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        call: Call,
        req: reqwest::RequestBuilder,
    ) -> RemoteResult<T> {
        let body = self.send(call, req).await?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MediaApi for HttpMediaApi {
    async fn request_upload_slot(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
        mime: &Mime,
    ) -> RemoteResult<UploadSlot> {
        let url = self.url(&format!("/v1/resources/{resource}/media/uploads"))?;
        let request = RequestUploadSlotRequest {
            tag,
            mime_type: mime.essence_str(),
        };
        let response: UploadSlotResponse = self
            .send_json(Call::RequestSlot, self.http.post(url).json(&request))
            .await?;
        response.into_slot()
    }

    async fn put_bytes(&self, put_url: &Url, bytes: Bytes, mime: &Mime) -> RemoteResult<()> {
        // The URL is pre-authorized; the bearer token must not leak to storage.
        let response = self
            .transfer
            .put(put_url.clone())
            .header(CONTENT_TYPE, mime.as_ref())
            .body(bytes)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(Call::Put, status, body));
        }
        Ok(())
    }

    async fn confirm_upload(&self, upload_id: &UploadId) -> RemoteResult<ConfirmedMedia> {
        let url = self.url(&format!("/v1/media/uploads/{upload_id}/confirm"))?;
        let response: ConfirmUploadResponse = self
            .send_json(Call::Confirm, self.http.post(url))
            .await
            .map_err(|e| match e {
                RemoteError::Decode(msg) => RemoteError::Confirmation(msg),
                other => other,
            })?;
        response.into_media()
    }

    async fn reorder_confirmed(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
        ordered: &[MediaId],
    ) -> RemoteResult<()> {
        let url = self.url(&format!("/v1/resources/{resource}/media/order"))?;
        let request = ReorderRequest::new(tag, ordered);
        self.send(Call::Other, self.http.put(url).json(&request))
            .await
            .map(|_| ())
    }

    async fn delete_media(&self, id: MediaId) -> RemoteResult<()> {
        let url = self.url(&format!("/v1/media/{id}"))?;
        self.send(Call::Other, self.http.delete(url))
            .await
            .map(|_| ())
    }

    async fn list_media(
        &self,
        resource: &ResourceId,
        tag: MediaTag,
    ) -> RemoteResult<Vec<RemoteMedia>> {
        let mut url = self.url(&format!("/v1/resources/{resource}/media"))?;
        url.query_pairs_mut().append_pair("tag", tag.as_str());
        let response: MediaListResponse = self.send_json(Call::Other, self.http.get(url)).await?;
        Ok(response.into_ordered())
    }

    async fn toggle_wishlist(&self, resource: &ResourceId, add: bool) -> RemoteResult<()> {
        let url = self.url(&format!("/v1/wishlist/{resource}"))?;
        let req = if add {
            self.http.post(url)
        } else {
            self.http.delete(url)
        };
        self.send(Call::Other, req).await.map(|_| ())
    }

    async fn list_wishlist(&self) -> RemoteResult<Vec<ResourceId>> {
        let url = self.url("/v1/wishlist")?;
        let listing: WishlistListing = self.send_json(Call::Other, self.http.get(url)).await?;
        listing.into_resource_ids()
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_call() {
        let status = |code| StatusCode::from_u16(code).unwrap();

        assert!(matches!(
            classify(Call::RequestSlot, status(403), "no".into()),
            RemoteError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(Call::RequestSlot, status(409), "full".into()),
            RemoteError::Quota(_)
        ));
        assert!(matches!(
            classify(Call::Confirm, status(404), "gone".into()),
            RemoteError::Confirmation(_)
        ));
        assert!(matches!(
            classify(Call::Put, status(500), String::new()),
            RemoteError::Transport(_)
        ));
        assert!(matches!(
            classify(Call::Put, status(403), String::new()),
            RemoteError::Transport(_)
        ));
        assert!(matches!(
            classify(Call::Other, status(404), String::new()),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            classify(Call::Other, status(503), String::new()),
            RemoteError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_from_config_validates() {
        let config = ApiConfig {
            base_url: "ftp://nope".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpMediaApi::from_config(&config),
            Err(RemoteError::Config(_))
        ));
        assert!(HttpMediaApi::from_config(&ApiConfig::default()).is_ok());
    }
}
