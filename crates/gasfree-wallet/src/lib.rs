//! Account layer for gas-free token transfers.
//!
//! A [`GasFreeAccount`] turns a transfer intent into a signed,
//! relay-submitted job:
//!
//! 1. Resolve the relay-side account (shadow address, nonce, fee schedule)
//! 2. Quote the fee and enforce the caller's ceiling
//! 3. Build and sign the permit message
//! 4. Submit to the relay and map the job into a transfer result
//!
//! Chain queries (token balances, transaction receipts) are delegated to
//! the [`ChainClient`] collaborator; the account never talks to the chain
//! directly.

use async_trait::async_trait;

use gasfree_types::Result;

pub mod account;
pub mod permit;

pub use account::{GasFreeAccount, TransferRequest};
pub use permit::PermitTransferMessage;

/// Configuration consumed by the account layer.
#[derive(Debug, Clone)]
pub struct GasFreeConfig {
    pub chain_id: u64,
    /// Relay base URL.
    pub gas_free_provider: String,
    pub api_key: String,
    pub api_secret: String,
    /// Service provider address carried inside every permit.
    pub service_provider: String,
    /// Controller contract the relay verifies signatures against. Must
    /// match the relay's deployment exactly.
    pub verifying_contract: String,
    /// Default token moved when a transfer names none.
    pub paymaster_token: Option<String>,
    /// Default fee ceiling applied to every transfer.
    pub transfer_max_fee: Option<u64>,
}

/// Delegated chain wallet collaborator.
///
/// The receipt payload is chain-defined and passed through verbatim.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_token_balance(&self, token: &str, holder: &str) -> Result<u64>;
    async fn get_transaction_receipt(&self, txn_hash: &str) -> Result<serde_json::Value>;
}
