use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// GasFree SDK error types.
#[derive(Debug, Error)]
pub enum GasFreeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("missing value for field: {0}")]
    MissingField(String),

    #[error("unknown struct type: {0}")]
    UnknownType(String),

    #[error("token not supported by the gas free provider: {0}")]
    TokenNotSupported(String),

    #[error("estimated fee {fee} meets or exceeds the max fee limit {max_fee}")]
    FeeLimitExceeded { fee: u64, max_fee: u64 },

    #[error("Gas free provider error ({reason}): {message}.")]
    Provider { reason: String, message: String },

    #[error("http request failed: {0}")]
    Http(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GasFreeError>;

/// Per-token fee schedule reported by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFees {
    pub token_address: String,
    pub transfer_fee: u64,
    pub activate_fee: u64,
}

/// Relay-managed account state for one owner address.
///
/// `gas_free_address` is the relay-controlled receiving address, distinct
/// from the owner's own address. `nonce` is consumed by each successful
/// submission; `active` flips once the shadow account is provisioned
/// on-chain and removes the activation fee from later quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayAccount {
    pub account_address: String,
    pub gas_free_address: String,
    pub active: bool,
    pub nonce: u64,
    #[serde(default)]
    pub assets: Vec<AssetFees>,
}

/// Estimated total cost of a transfer before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferQuote {
    pub fee: u64,
}

/// Outcome of a submitted transfer.
///
/// `hash` is the relay's job identifier, not a chain transaction hash;
/// the two are related only through the receipt resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub hash: String,
    pub fee: u64,
}

/// Parse a hex string (with or without 0x prefix) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| GasFreeError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> Hex {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let bytes = vec![0x19u8, 0x01, 0xff];
        let encoded = bytes_to_hex(&bytes);
        assert_eq!(encoded, "0x1901ff");
        assert_eq!(hex_to_bytes(&encoded).unwrap(), bytes);
        assert_eq!(hex_to_bytes("1901ff").unwrap(), bytes);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(hex_to_bytes("0xzz").is_err());
    }

    #[test]
    fn test_provider_error_display() {
        let err = GasFreeError::Provider {
            reason: "DEADLINE_EXCEEDED".into(),
            message: "permit expired".into(),
        };
        assert_eq!(
            err.to_string(),
            "Gas free provider error (DEADLINE_EXCEEDED): permit expired."
        );
    }

    #[test]
    fn test_relay_account_wire_format() {
        let json = r#"{
            "accountAddress": "TUg28KYvCXWW81EqMUeZvCZmZw2BChk1HQ",
            "gasFreeAddress": "TTpKHSFUdoi9j2zacMcRx522rztL61ojFS",
            "active": false,
            "nonce": 7,
            "assets": [
                {"tokenAddress": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", "transferFee": 100, "activateFee": 50}
            ]
        }"#;
        let account: RelayAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.nonce, 7);
        assert!(!account.active);
        assert_eq!(account.assets[0].transfer_fee, 100);
        assert_eq!(account.assets[0].activate_fee, 50);
    }
}
