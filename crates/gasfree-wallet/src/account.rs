//! Transfer orchestration: resolve the relay account, quote fees, sign
//! the permit, submit, and resolve receipts.
//!
//! Each account instance exclusively owns its cached relay state. The
//! cache is populated once on first use; `re_resolve_account` is the only
//! refresh path. A successful submission consumes the relay-side nonce,
//! so issuing a second transfer against the cached state produces a
//! permit the relay will reject.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use gasfree_crypto::{address, PermitSigner};
use gasfree_relay::{RelayApi, RelayClient, SubmitRequest};
use gasfree_types::{
    AssetFees, GasFreeError, RelayAccount, Result, TransferQuote, TransferResult,
};

use crate::permit::{PermitTransferMessage, PERMIT_TTL_SECS, PERMIT_VERSION};
use crate::{ChainClient, GasFreeConfig};

/// A transfer intent.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Token contract; defaults to the configured paymaster token.
    pub token: Option<String>,
    pub to: String,
    /// Amount in the token's base unit.
    pub amount: u64,
    /// Per-call fee ceiling, overriding the configured default.
    pub transfer_max_fee: Option<u64>,
}

impl TransferRequest {
    pub fn new(to: &str, amount: u64) -> Self {
        Self {
            token: None,
            to: to.to_string(),
            amount,
            transfer_max_fee: None,
        }
    }
}

/// An account that moves tokens through the gas free relay.
pub struct GasFreeAccount {
    config: GasFreeConfig,
    signer: PermitSigner,
    relay: Arc<dyn RelayApi>,
    chain: Arc<dyn ChainClient>,
    account: Option<RelayAccount>,
}

impl GasFreeAccount {
    /// Build an account talking to the configured relay over HTTP.
    pub fn new(
        config: GasFreeConfig,
        private_key: &str,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self> {
        let relay = Arc::new(RelayClient::new(
            &config.gas_free_provider,
            &config.api_key,
            &config.api_secret,
            None,
        ));
        Self::with_relay(config, private_key, relay, chain)
    }

    /// Build an account against an explicit relay implementation.
    pub fn with_relay(
        config: GasFreeConfig,
        private_key: &str,
        relay: Arc<dyn RelayApi>,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self> {
        let signer = PermitSigner::from_private_key(private_key)?;
        Ok(Self {
            config,
            signer,
            relay,
            chain,
            account: None,
        })
    }

    /// The owner's own address (not the relay shadow address).
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    /// The relay-controlled shadow address receiving on behalf of the owner.
    pub async fn gas_free_address(&mut self) -> Result<String> {
        Ok(self.resolve_account().await?.gas_free_address)
    }

    /// Relay account state, fetched once and then served from the cache.
    pub async fn resolve_account(&mut self) -> Result<RelayAccount> {
        if self.account.is_none() {
            let account = self.relay.get_account(self.signer.address()).await?;
            self.account = Some(account);
        }
        self.account
            .clone()
            .ok_or_else(|| GasFreeError::Other("relay account cache empty".into()))
    }

    /// Drop the cache and fetch fresh nonce/activation state.
    pub async fn re_resolve_account(&mut self) -> Result<RelayAccount> {
        self.account = None;
        self.resolve_account().await
    }

    /// Estimate the total cost of a transfer without signing or submitting.
    pub async fn quote_transfer(&mut self, request: &TransferRequest) -> Result<TransferQuote> {
        let token = self.request_token(request)?;
        let account = self.resolve_account().await?;
        let fee = fee_for(&account, &token)?;
        Ok(TransferQuote { fee })
    }

    /// Sign and submit a transfer; returns the relay job id and the
    /// relay's post-submission fee estimate.
    pub async fn transfer(&mut self, request: &TransferRequest) -> Result<TransferResult> {
        let token = self.request_token(request)?;
        address::validate(&token)?;
        address::validate(&request.to)?;

        let account = self.resolve_account().await?;
        let fee = fee_for(&account, &token)?;

        if let Some(max_fee) = request.transfer_max_fee.or(self.config.transfer_max_fee) {
            if fee >= max_fee {
                return Err(GasFreeError::FeeLimitExceeded { fee, max_fee });
            }
        }

        let message = PermitTransferMessage {
            token: token.clone(),
            service_provider: self.config.service_provider.clone(),
            user: self.signer.address().to_string(),
            receiver: request.to.clone(),
            value: request.amount,
            // The signed ceiling is the live quote; the caller's limit is a
            // local guard only and never widens the authorization.
            max_fee: fee,
            deadline: unix_now() + PERMIT_TTL_SECS,
            version: PERMIT_VERSION,
            nonce: account.nonce,
        };

        let domain =
            PermitTransferMessage::domain(self.config.chain_id, &self.config.verifying_contract);
        let digest = message.signing_digest(&domain)?;
        let signature = self.signer.sign_digest(&digest)?;

        debug!(
            token = %token,
            amount = request.amount,
            fee,
            nonce = message.nonce,
            "submitting gas free transfer"
        );

        let response = self
            .relay
            .submit_transfer(&submit_request(&message, signature.concat()))
            .await?;

        Ok(TransferResult {
            hash: response.id,
            fee: response.estimated_transfer_fee + response.estimated_activate_fee,
        })
    }

    /// Receipt for a relay job, or `None` while the relay has not yet
    /// assigned a chain transaction hash.
    pub async fn get_receipt(&self, relay_job_id: &str) -> Result<Option<serde_json::Value>> {
        let status = self.relay.get_transfer(relay_job_id).await?;
        match status.txn_hash {
            Some(txn_hash) => Ok(Some(self.chain.get_transaction_receipt(&txn_hash).await?)),
            None => Ok(None),
        }
    }

    /// Balance of the configured paymaster token, via the chain client.
    pub async fn token_balance(&self) -> Result<u64> {
        let token = self.config.paymaster_token.clone().ok_or_else(|| {
            GasFreeError::Other("no paymaster token configured".into())
        })?;
        self.chain
            .get_token_balance(&token, self.signer.address())
            .await
    }

    /// Provider-wide fee schedule.
    pub async fn token_fees(&self) -> Result<Vec<AssetFees>> {
        self.relay.list_tokens().await
    }

    /// Native transactions never go through this account.
    pub fn send_transaction(&self, _to: &str, _amount: u64) -> Result<TransferResult> {
        Err(GasFreeError::Unsupported(
            "native transactions cannot be sent through a gas free account; use transfer()".into(),
        ))
    }

    /// Scrub the in-memory private key. Idempotent; does not touch the
    /// cached relay account state or in-flight requests.
    pub fn dispose(&mut self) {
        self.signer.dispose();
    }

    fn request_token(&self, request: &TransferRequest) -> Result<String> {
        request
            .token
            .clone()
            .or_else(|| self.config.paymaster_token.clone())
            .ok_or_else(|| {
                GasFreeError::Other("transfer names no token and no paymaster token is configured".into())
            })
    }
}

/// Transfer fee plus the activation fee while the shadow account is
/// not yet provisioned.
fn fee_for(account: &RelayAccount, token: &str) -> Result<u64> {
    let asset = account
        .assets
        .iter()
        .find(|a| address::same_address(&a.token_address, token))
        .ok_or_else(|| GasFreeError::TokenNotSupported(token.to_string()))?;
    let activation = if account.active { 0 } else { asset.activate_fee };
    Ok(asset.transfer_fee + activation)
}

fn submit_request(message: &PermitTransferMessage, sig: String) -> SubmitRequest {
    SubmitRequest {
        token: message.token.clone(),
        service_provider: message.service_provider.clone(),
        user: message.user.clone(),
        receiver: message.receiver.clone(),
        value: message.value,
        max_fee: message.max_fee,
        deadline: message.deadline,
        version: message.version,
        nonce: message.nonce,
        sig,
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
