//! Recoverable secp256k1 signing over typed-data digests.
//!
//! Output format: 32-byte r and s, each zero-padded to 64 hex chars, and a
//! one-byte v = recovery id + 27, concatenated. Signatures are low-S
//! normalized. Key material is zeroized on disposal.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use gasfree_types::{hex_to_bytes, GasFreeError, Result};

use crate::address;

/// An (r, s, v) signature over a 32-byte digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitSignature {
    /// 64 hex chars, no prefix.
    pub r: String,
    /// 64 hex chars, no prefix.
    pub s: String,
    /// recovery id + 27
    pub v: u8,
}

impl PermitSignature {
    /// r || s || v as hex, without the 0x prefix (the relay's wire form).
    pub fn concat(&self) -> String {
        format!("{}{}{:02x}", self.r, self.s, self.v)
    }

    /// 0x-prefixed r || s || v.
    pub fn to_hex(&self) -> String {
        format!("0x{}", self.concat())
    }
}

/// Signer holding the account's private scalar.
///
/// The owner address is derived once at construction, so it stays
/// readable after `dispose()`.
pub struct PermitSigner {
    key: Option<SigningKey>,
    owner_address: String,
}

impl fmt::Debug for PermitSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermitSigner")
            .field("owner_address", &self.owner_address)
            .field("disposed", &self.key.is_none())
            .finish()
    }
}

impl PermitSigner {
    /// Build a signer from a hex-encoded 32-byte private key.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let mut raw = hex_to_bytes(private_key)?;
        let parsed = SigningKey::from_slice(&raw)
            .map_err(|e| GasFreeError::Signing(format!("invalid private key: {}", e)));
        raw.zeroize();
        let key = parsed?;

        let point = key.verifying_key().to_encoded_point(false);
        let owner_address = address::from_public_key(point.as_bytes())?;

        Ok(Self {
            key: Some(key),
            owner_address,
        })
    }

    /// The owner's base58check address. Never fails, even after disposal.
    pub fn address(&self) -> &str {
        &self.owner_address
    }

    /// Uncompressed SEC1 public key (65 bytes).
    pub fn public_key(&self) -> Result<Vec<u8>> {
        let key = self.active_key()?;
        Ok(key.verifying_key().to_encoded_point(false).as_bytes().to_vec())
    }

    /// Sign a 32-byte digest, returning a low-S (r, s, v) signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<PermitSignature> {
        let key = self.active_key()?;
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(digest)
            .map_err(|e| GasFreeError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        Ok(PermitSignature {
            r: hex::encode(&bytes[..32]),
            s: hex::encode(&bytes[32..]),
            v: recovery_id.to_byte() + 27,
        })
    }

    /// Scrub the private scalar. Idempotent; the key zeroizes on drop.
    pub fn dispose(&mut self) {
        self.key = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.key.is_none()
    }

    fn active_key(&self) -> Result<&SigningKey> {
        self.key
            .as_ref()
            .ok_or_else(|| GasFreeError::Signing("key material has been disposed".into()))
    }
}

/// Recover the signing address from a digest and signature.
pub fn recover_address(digest: &[u8; 32], signature: &PermitSignature) -> Result<String> {
    let mut raw = Vec::with_capacity(64);
    raw.extend_from_slice(&hex_to_bytes(&signature.r)?);
    raw.extend_from_slice(&hex_to_bytes(&signature.s)?);
    let sig = Signature::from_slice(&raw)
        .map_err(|e| GasFreeError::Signing(format!("malformed signature: {}", e)))?;

    let recovery_id = RecoveryId::from_byte(signature.v.wrapping_sub(27))
        .ok_or_else(|| GasFreeError::Signing(format!("invalid v byte: {}", signature.v)))?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| GasFreeError::Signing(format!("recovery failed: {}", e)))?;

    address::from_public_key(verifying_key.to_encoded_point(false).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> serde_json::Value {
        let data = include_str!("../../../tests/vectors/typed_data.json");
        serde_json::from_str(data).unwrap()
    }

    fn vector_digest(v: &serde_json::Value) -> [u8; 32] {
        let digest = hex_to_bytes(v["expected"]["digest"].as_str().unwrap()).unwrap();
        digest.try_into().unwrap()
    }

    #[test]
    fn test_known_vector_signature() {
        let v = vector();
        let signer =
            PermitSigner::from_private_key(v["signer"]["privateKey"].as_str().unwrap()).unwrap();
        assert_eq!(signer.address(), v["signer"]["address"].as_str().unwrap());

        let sig = signer.sign_digest(&vector_digest(&v)).unwrap();
        assert_eq!(sig.r, v["signer"]["signature"]["r"].as_str().unwrap());
        assert_eq!(sig.s, v["signer"]["signature"]["s"].as_str().unwrap());
        assert_eq!(u64::from(sig.v), v["signer"]["signature"]["v"].as_u64().unwrap());
    }

    #[test]
    fn test_signature_hex_layout() {
        let v = vector();
        let signer =
            PermitSigner::from_private_key(v["signer"]["privateKey"].as_str().unwrap()).unwrap();
        let sig = signer.sign_digest(&vector_digest(&v)).unwrap();

        let hex_sig = sig.to_hex();
        assert!(hex_sig.starts_with("0x"));
        assert_eq!(hex_sig.len(), 2 + 64 + 64 + 2);
        assert_eq!(sig.concat(), hex_sig.trim_start_matches("0x"));
    }

    #[test]
    fn test_recover_round_trip() {
        let v = vector();
        let signer =
            PermitSigner::from_private_key(v["signer"]["privateKey"].as_str().unwrap()).unwrap();
        let digest = vector_digest(&v);
        let sig = signer.sign_digest(&digest).unwrap();
        assert_eq!(recover_address(&digest, &sig).unwrap(), signer.address());
    }

    #[test]
    fn test_distinct_digests_distinct_signatures() {
        let v = vector();
        let signer =
            PermitSigner::from_private_key(v["signer"]["privateKey"].as_str().unwrap()).unwrap();
        let a = signer.sign_digest(&[0x11u8; 32]).unwrap();
        let b = signer.sign_digest(&[0x22u8; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dispose_is_idempotent_and_blocks_signing() {
        let v = vector();
        let mut signer =
            PermitSigner::from_private_key(v["signer"]["privateKey"].as_str().unwrap()).unwrap();
        let expected_address = signer.address().to_string();

        signer.dispose();
        signer.dispose();
        assert!(signer.is_disposed());
        assert_eq!(signer.address(), expected_address);
        assert!(signer.sign_digest(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_dispose_before_signing_is_safe() {
        let v = vector();
        let mut signer =
            PermitSigner::from_private_key(v["signer"]["privateKey"].as_str().unwrap()).unwrap();
        signer.dispose();
        assert!(signer.public_key().is_err());
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        assert!(PermitSigner::from_private_key("0x00").is_err());
        assert!(PermitSigner::from_private_key("not hex").is_err());
    }
}
