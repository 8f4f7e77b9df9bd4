//! Authenticated HTTP client for the gas free relay.
//!
//! Every request is signed: `base64(HMAC-SHA256(secret, method + path +
//! unix_seconds))`, sent as `Authorization: ApiKey {key}:{signature}`
//! alongside a `Timestamp` header. The client performs no retries; callers
//! own retry policy.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;

use gasfree_types::{AssetFees, GasFreeError, RelayAccount, Result};

use crate::{RelayApi, RelayResponse, SubmitRequest, SubmitResponse, TokenList, TransferStatus};

type HmacSha256 = Hmac<Sha256>;

/// HTTP client holding the relay base URL and API credentials.
pub struct RelayClient {
    base_url: String,
    api_key: String,
    api_secret: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(base_url: &str, api_key: &str, api_secret: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(30_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// signature = base64(HMAC-SHA256(secret, method + path + timestamp))
    fn sign_request(&self, method: &str, path: &str, timestamp: u64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| GasFreeError::Other(format!("invalid api secret: {}", e)))?;
        mac.update(format!("{}{}{}", method, path, timestamp).as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Single authenticated request primitive used by every endpoint.
    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let signature = self.sign_request(method.as_str(), path, timestamp)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .request(method, &url)
            .timeout(self.timeout)
            .header("Timestamp", timestamp.to_string())
            .header(
                "Authorization",
                format!("ApiKey {}:{}", self.api_key, signature),
            )
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GasFreeError::Http(format!("relay request failed: {}", e)))?;

        let status = response.status();
        debug!(status = %status, path, "relay response");

        let text = response
            .text()
            .await
            .map_err(|e| GasFreeError::Http(format!("failed to read relay response: {}", e)))?;

        if !status.is_success() {
            return Err(envelope_error(&text, status.as_u16()));
        }

        let envelope: RelayResponse<T> = serde_json::from_str(&text)
            .map_err(|e| GasFreeError::Http(format!("failed to parse relay response: {}", e)))?;
        match envelope.data {
            Some(data) => Ok(data),
            None => Err(GasFreeError::Provider {
                reason: envelope.reason.unwrap_or_else(|| "UNKNOWN".into()),
                message: envelope
                    .message
                    .unwrap_or_else(|| "relay returned no data".into()),
            }),
        }
    }
}

/// Map a non-success response body onto the relay's error envelope.
fn envelope_error(body: &str, status: u16) -> GasFreeError {
    match serde_json::from_str::<RelayResponse<serde_json::Value>>(body) {
        Ok(envelope) => GasFreeError::Provider {
            reason: envelope.reason.unwrap_or_else(|| format!("HTTP_{}", status)),
            message: envelope.message.unwrap_or_else(|| body.to_string()),
        },
        Err(_) => GasFreeError::Http(format!("relay returned status {}: {}", status, body)),
    }
}

#[async_trait]
impl RelayApi for RelayClient {
    async fn get_account(&self, address: &str) -> Result<RelayAccount> {
        self.request(Method::GET, &format!("/api/v1/address/{}", address), None::<&()>)
            .await
    }

    async fn list_tokens(&self) -> Result<Vec<AssetFees>> {
        let list: TokenList = self
            .request(Method::GET, "/api/v1/config/token/all", None::<&()>)
            .await?;
        Ok(list.tokens)
    }

    async fn submit_transfer(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        self.request(Method::POST, "/api/v1/gasfree/submit", Some(request))
            .await
    }

    async fn get_transfer(&self, id: &str) -> Result<TransferStatus> {
        self.request(Method::GET, &format!("/api/v1/gasfree/{}", id), None::<&()>)
            .await
    }
}
