//! The permit transfer message: a domain-separated typed-data payload
//! authorizing the relay to move tokens on the signer's behalf.

use serde_json::{json, Value};

use gasfree_crypto::typed_data::{self, TypeMap, TypedDataDomain, TypedDataField};
use gasfree_types::Result;

/// Domain name the relay's controller contract verifies against.
pub const DOMAIN_NAME: &str = "GasFreeController";
pub const DOMAIN_VERSION: &str = "V1.0.0";
pub const PERMIT_TYPE_NAME: &str = "PermitTransfer";
/// Fixed protocol version carried inside every permit.
pub const PERMIT_VERSION: u64 = 1;
/// Seconds from signing time to the permit deadline.
pub const PERMIT_TTL_SECS: u64 = 300;

/// One single-use transfer authorization.
///
/// `nonce` must equal the relay account's current nonce at signing time;
/// the relay rejects mismatches, this layer does not validate them.
#[derive(Debug, Clone)]
pub struct PermitTransferMessage {
    pub token: String,
    pub service_provider: String,
    pub user: String,
    pub receiver: String,
    /// Transfer amount in the token's base unit.
    pub value: u64,
    /// Ceiling the signer authorizes the relay to deduct.
    pub max_fee: u64,
    /// Unix timestamp after which the relay must reject the permit.
    pub deadline: u64,
    pub version: u64,
    pub nonce: u64,
}

impl PermitTransferMessage {
    /// Typed-data declaration of the permit struct.
    pub fn type_map() -> TypeMap {
        let mut types = TypeMap::new();
        types.insert(
            PERMIT_TYPE_NAME.to_string(),
            vec![
                TypedDataField::new("token", "address"),
                TypedDataField::new("serviceProvider", "address"),
                TypedDataField::new("user", "address"),
                TypedDataField::new("receiver", "address"),
                TypedDataField::new("value", "uint256"),
                TypedDataField::new("maxFee", "uint256"),
                TypedDataField::new("deadline", "uint256"),
                TypedDataField::new("version", "uint256"),
                TypedDataField::new("nonce", "uint256"),
            ],
        );
        types
    }

    /// The message as a typed-data value object.
    pub fn to_value(&self) -> Value {
        json!({
            "token": self.token,
            "serviceProvider": self.service_provider,
            "user": self.user,
            "receiver": self.receiver,
            "value": self.value,
            "maxFee": self.max_fee,
            "deadline": self.deadline,
            "version": self.version,
            "nonce": self.nonce,
        })
    }

    /// Signing domain for one protocol deployment.
    pub fn domain(chain_id: u64, verifying_contract: &str) -> TypedDataDomain {
        TypedDataDomain {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract: verifying_contract.to_string(),
        }
    }

    /// The 32-byte digest the account signs.
    pub fn signing_digest(&self, domain: &TypedDataDomain) -> Result<[u8; 32]> {
        typed_data::signing_digest(domain, &Self::type_map(), PERMIT_TYPE_NAME, &self.to_value())
    }
}
