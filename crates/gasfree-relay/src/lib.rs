//! Wire types and client for the gas free relay service.
//!
//! Endpoints:
//! - GET  /api/v1/address/{address}
//! - GET  /api/v1/config/token/all
//! - POST /api/v1/gasfree/submit
//! - GET  /api/v1/gasfree/{id}
//!
//! Every call carries a timestamped HMAC signature (see `client`). All
//! endpoints sit behind the [`RelayApi`] trait so orchestration code can
//! run against an in-memory fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gasfree_types::{AssetFees, RelayAccount, Result};

pub mod client;

pub use client::RelayClient;

/// Relay API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse<T> {
    pub code: Option<i64>,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Signed permit submission for POST /api/v1/gasfree/submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub token: String,
    pub service_provider: String,
    pub user: String,
    pub receiver: String,
    pub value: u64,
    pub max_fee: u64,
    pub deadline: u64,
    pub version: u64,
    pub nonce: u64,
    /// r || s || v hex, without the 0x prefix.
    pub sig: String,
}

/// Relay's answer to a submission: the job id and its own fee estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: String,
    pub estimated_transfer_fee: u64,
    pub estimated_activate_fee: u64,
}

/// Payload of GET /api/v1/config/token/all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenList {
    pub tokens: Vec<AssetFees>,
}

/// Transfer job status. `txn_hash` stays empty until the relay has
/// broadcast the on-chain transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub txn_hash: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// The relay's HTTP surface.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Resolve relay-side account state for an owner address.
    async fn get_account(&self, address: &str) -> Result<RelayAccount>;

    /// Provider-wide per-token fee schedule.
    async fn list_tokens(&self) -> Result<Vec<AssetFees>>;

    /// Submit a signed permit; returns the relay job id and fee estimate.
    async fn submit_transfer(&self, request: &SubmitRequest) -> Result<SubmitResponse>;

    /// Current status of a submitted transfer job.
    async fn get_transfer(&self, id: &str) -> Result<TransferStatus>;
}
