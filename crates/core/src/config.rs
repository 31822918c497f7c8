//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level client configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Upload pipeline settings.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl ClientConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.api.validate()?;
        self.upload.validate()
    }
}

/// Backend API configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the marketplace API (e.g., "https://api.example.com").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token used for authenticated calls.
    /// WARNING: Prefer the ROOST_API__TOKEN env var over storing secrets in config files.
    #[serde(default)]
    pub token: Option<String>,
    /// Timeout for control-plane requests in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| format!("api.base_url is not a valid URL: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("api.request_timeout_secs must be positive".to_string());
        }
        if self.token.as_deref().is_some_and(str::is_empty) {
            return Err("api.token must not be empty when set".to_string());
        }
        Ok(())
    }
}

/// Upload pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upper bound on a single byte transfer in seconds. 0 disables the timeout.
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
    /// Attempts per file, counting the first. Only transport failures are retried,
    /// and each retry starts over from the upload-slot request.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds; doubles on each retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_transfer_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_secs: default_transfer_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl UploadConfig {
    /// Transfer timeout, or `None` when disabled.
    pub fn transfer_timeout(&self) -> Option<Duration> {
        (self.transfer_timeout_secs > 0).then(|| Duration::from_secs(self.transfer_timeout_secs))
    }

    /// Backoff before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(1 << shift))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("upload.max_attempts must be at least 1".to_string());
        }
        if self.max_attempts > 10 {
            return Err(format!(
                "upload.max_attempts must be at most 10, got {}",
                self.max_attempts
            ));
        }
        Ok(())
    }
}
