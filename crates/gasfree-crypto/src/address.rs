//! Native address codec.
//!
//! Addresses are 21 bytes: a fixed 0x41 prefix followed by the low 20
//! bytes of keccak256(uncompressed public key without the 0x04 tag).
//! The human-readable form is base58check (double-SHA256 checksum).
//!
//! Accepted input forms:
//! - base58check ("T...")
//! - 42-char hex with the 41 prefix ("41...")
//! - 0x-prefixed 20-byte hex ("0x..."), prefix added on decode

use gasfree_types::{GasFreeError, Result};

use crate::keccak256;

/// Network prefix byte for the native address format.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// Raw length of a decoded address including the prefix byte.
pub const ADDRESS_LEN: usize = 21;

/// Decode an address from any accepted form into its 21-byte raw form.
pub fn decode(address: &str) -> Result<[u8; ADDRESS_LEN]> {
    let bytes = if let Some(stripped) = address.strip_prefix("0x") {
        let mut raw = vec![ADDRESS_PREFIX];
        raw.extend(
            hex::decode(stripped)
                .map_err(|e| GasFreeError::InvalidAddress(format!("{}: {}", address, e)))?,
        );
        raw
    } else if address.len() == ADDRESS_LEN * 2 && address.starts_with("41") {
        hex::decode(address)
            .map_err(|e| GasFreeError::InvalidAddress(format!("{}: {}", address, e)))?
    } else {
        bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|e| GasFreeError::InvalidAddress(format!("{}: {}", address, e)))?
    };

    if bytes.len() != ADDRESS_LEN || bytes[0] != ADDRESS_PREFIX {
        return Err(GasFreeError::InvalidAddress(format!(
            "{}: expected {} bytes with 0x{:02x} prefix",
            address, ADDRESS_LEN, ADDRESS_PREFIX
        )));
    }

    let mut raw = [0u8; ADDRESS_LEN];
    raw.copy_from_slice(&bytes);
    Ok(raw)
}

/// Encode a 21-byte raw address as base58check.
pub fn encode(raw: &[u8; ADDRESS_LEN]) -> String {
    bs58::encode(raw).with_check().into_string()
}

/// Check that a string decodes as a valid native address.
pub fn validate(address: &str) -> Result<()> {
    decode(address).map(|_| ())
}

/// The 20-byte tail of an address, without the network prefix.
pub fn to_evm_bytes(raw: &[u8; ADDRESS_LEN]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&raw[1..]);
    out
}

/// Derive the owner address from an uncompressed secp256k1 public key.
pub fn from_public_key(public_key: &[u8]) -> Result<String> {
    let body = match public_key.len() {
        65 if public_key[0] == 0x04 => &public_key[1..],
        64 => public_key,
        n => {
            return Err(GasFreeError::InvalidAddress(format!(
                "public key must be 64 or 65 bytes, got {}",
                n
            )))
        }
    };

    let hash = keccak256(body);
    let mut raw = [0u8; ADDRESS_LEN];
    raw[0] = ADDRESS_PREFIX;
    raw[1..].copy_from_slice(&hash[12..]);
    Ok(encode(&raw))
}

/// Whether two address strings refer to the same account, regardless of
/// the textual form each one uses.
pub fn same_address(a: &str, b: &str) -> bool {
    match (decode(a), decode(b)) {
        (Ok(ra), Ok(rb)) => ra == rb,
        _ => a.eq_ignore_ascii_case(b),
    }
}
