//! Pure computation for the GasFree protocol:
//!
//! - Native address codec (base58check, 21-byte 0x41-prefixed)
//! - Typed-structured-data hashing (canonical type strings, recursive
//!   struct hashes, 0x1901 domain-separated digest)
//! - Recoverable secp256k1 signing over the digest

pub mod address;
pub mod signer;
pub mod typed_data;

pub use signer::{PermitSignature, PermitSigner};
pub use typed_data::{TypeMap, TypedDataDomain, TypedDataField};

use sha3::{Digest, Keccak256};

/// Keccak-256 convenience wrapper.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    Keccak256::digest(input).into()
}
