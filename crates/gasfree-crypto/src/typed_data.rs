//! Typed-structured-data hashing with domain separation.
//!
//! Pipeline:
//! 1. `encode_type`: canonical type string (primary first, then referenced
//!    struct types sorted lexicographically, no separators)
//! 2. `type_hash` = keccak256(type string)
//! 3. `encode_data`: one 32-byte slot per declared field, in order
//! 4. `hash_struct` = keccak256(type_hash || encoded data)
//! 5. `signing_digest` = keccak256(0x1901 || hash_struct(domain) || hash_struct(message))
//!
//! Values are carried as `serde_json::Value` so arbitrary type maps can be
//! hashed without a compile-time struct definition.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use gasfree_types::{hex_to_bytes, GasFreeError, Result};

use crate::{address, keccak256};

/// Struct type name the domain hashes under.
pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// One declared field of a struct type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedDataField {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Struct type declarations, keyed by type name.
pub type TypeMap = BTreeMap<String, Vec<TypedDataField>>;

/// Signing context: binds a signature to one protocol deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

impl TypedDataDomain {
    fn type_map() -> TypeMap {
        let mut types = TypeMap::new();
        types.insert(
            DOMAIN_TYPE_NAME.to_string(),
            vec![
                TypedDataField::new("name", "string"),
                TypedDataField::new("version", "string"),
                TypedDataField::new("chainId", "uint256"),
                TypedDataField::new("verifyingContract", "address"),
            ],
        );
        types
    }

    fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "version": self.version,
            "chainId": self.chain_id,
            "verifyingContract": self.verifying_contract,
        })
    }

    /// The domain separator hash.
    pub fn separator(&self) -> Result<[u8; 32]> {
        hash_struct(&Self::type_map(), DOMAIN_TYPE_NAME, &self.to_value())
    }
}

/// Strip any array suffix from a field type ("Person[]" -> "Person",
/// "uint256[3]" -> "uint256").
fn base_type(kind: &str) -> &str {
    match kind.find('[') {
        Some(idx) => &kind[..idx],
        None => kind,
    }
}

fn format_type(name: &str, fields: &[TypedDataField]) -> String {
    let args: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.kind, f.name))
        .collect();
    format!("{}({})", name, args.join(","))
}

fn collect_dependencies(types: &TypeMap, type_name: &str, seen: &mut BTreeSet<String>) {
    let Some(fields) = types.get(type_name) else {
        return;
    };
    for field in fields {
        let base = base_type(&field.kind);
        if types.contains_key(base) && seen.insert(base.to_string()) {
            collect_dependencies(types, base, seen);
        }
    }
}

/// Build the canonical type string for `primary`.
///
/// The primary type's signature comes first; every struct type it
/// references (directly or through arrays) follows in ascending
/// lexicographic order, concatenated without separators.
pub fn encode_type(types: &TypeMap, primary: &str) -> Result<String> {
    let primary_fields = types
        .get(primary)
        .ok_or_else(|| GasFreeError::UnknownType(primary.to_string()))?;

    let mut seen = BTreeSet::new();
    seen.insert(primary.to_string());
    collect_dependencies(types, primary, &mut seen);
    seen.remove(primary);

    let mut out = format_type(primary, primary_fields);
    for dep in &seen {
        // dep came out of the map, so the lookup cannot miss
        if let Some(fields) = types.get(dep) {
            out.push_str(&format_type(dep, fields));
        }
    }
    Ok(out)
}

/// keccak256 of the canonical type string.
pub fn type_hash(types: &TypeMap, primary: &str) -> Result<[u8; 32]> {
    Ok(keccak256(encode_type(types, primary)?.as_bytes()))
}

/// Encode a struct value field by field, one 32-byte slot each.
pub fn encode_data(types: &TypeMap, type_name: &str, value: &Value) -> Result<Vec<u8>> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| GasFreeError::UnknownType(type_name.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        GasFreeError::Other(format!("value for {} must be an object", type_name))
    })?;

    let mut out = Vec::with_capacity(32 * fields.len());
    for field in fields {
        let field_value = obj
            .get(&field.name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                GasFreeError::MissingField(format!("{}.{}", type_name, field.name))
            })?;
        out.extend_from_slice(&encode_field(types, &field.kind, field_value)?);
    }
    Ok(out)
}

/// hash_struct = keccak256(type_hash || encode_data).
pub fn hash_struct(types: &TypeMap, type_name: &str, value: &Value) -> Result<[u8; 32]> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&type_hash(types, type_name)?);
    buf.extend_from_slice(&encode_data(types, type_name, value)?);
    Ok(keccak256(&buf))
}

/// The final digest to sign: keccak256(0x1901 || domain hash || message hash).
pub fn signing_digest(
    domain: &TypedDataDomain,
    types: &TypeMap,
    primary: &str,
    message: &Value,
) -> Result<[u8; 32]> {
    let mut preimage = Vec::with_capacity(2 + 32 + 32);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(&domain.separator()?);
    preimage.extend_from_slice(&hash_struct(types, primary, message)?);
    Ok(keccak256(&preimage))
}

/// Encode a single field value into its 32-byte slot.
fn encode_field(types: &TypeMap, kind: &str, value: &Value) -> Result<[u8; 32]> {
    // Arrays: encode each element, hash the concatenation
    if kind.ends_with(']') {
        let elem_kind = base_type(kind);
        let items = value.as_array().ok_or_else(|| {
            GasFreeError::Other(format!("value for {} must be an array", kind))
        })?;
        let mut buf = Vec::with_capacity(32 * items.len());
        for item in items {
            buf.extend_from_slice(&encode_field(types, elem_kind, item)?);
        }
        return Ok(keccak256(&buf));
    }

    // Nested structs: recursive struct hash
    if types.contains_key(kind) {
        return hash_struct(types, kind, value);
    }

    match kind {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| GasFreeError::Other("string value expected".into()))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => {
            let s = value
                .as_str()
                .ok_or_else(|| GasFreeError::Other("hex string expected for bytes".into()))?;
            Ok(keccak256(&hex_to_bytes(s)?))
        }
        "address" => {
            let s = value
                .as_str()
                .ok_or_else(|| GasFreeError::Other("address string expected".into()))?;
            let raw = address::decode(s)?;
            let mut slot = [0u8; 32];
            slot[12..].copy_from_slice(&address::to_evm_bytes(&raw));
            Ok(slot)
        }
        // Chain-native token identifier, numerically encoded
        "trcToken" => encode_uint(value),
        other => generic_abi_slot(other, value),
    }
}

/// ABI-style fixed-width encoding for the remaining primitive types.
/// Unrecognized type names fall through to integer encoding.
fn generic_abi_slot(kind: &str, value: &Value) -> Result<[u8; 32]> {
    if kind == "bool" {
        let b = value
            .as_bool()
            .ok_or_else(|| GasFreeError::Other("bool value expected".into()))?;
        let mut slot = [0u8; 32];
        slot[31] = b as u8;
        return Ok(slot);
    }
    if let Some(rest) = kind.strip_prefix("bytes") {
        if !rest.is_empty() {
            let s = value.as_str().ok_or_else(|| {
                GasFreeError::Other(format!("hex string expected for {}", kind))
            })?;
            let bytes = hex_to_bytes(s)?;
            if bytes.len() > 32 {
                return Err(GasFreeError::Other(format!(
                    "{} value longer than 32 bytes",
                    kind
                )));
            }
            let mut slot = [0u8; 32];
            slot[..bytes.len()].copy_from_slice(&bytes);
            return Ok(slot);
        }
    }
    if kind.starts_with("int") {
        return encode_int(value);
    }
    encode_uint(value)
}

/// Unsigned integer slot: JSON number, decimal string, or 0x-hex string.
fn encode_uint(value: &Value) -> Result<[u8; 32]> {
    let mut slot = [0u8; 32];
    match value {
        Value::Number(n) => {
            let v = n
                .as_u64()
                .ok_or_else(|| GasFreeError::Other(format!("not an unsigned integer: {}", n)))?;
            slot[24..].copy_from_slice(&v.to_be_bytes());
            Ok(slot)
        }
        Value::String(s) => {
            if s.starts_with("0x") {
                let bytes = hex_to_bytes(s)?;
                if bytes.len() > 32 {
                    return Err(GasFreeError::Other("integer wider than 256 bits".into()));
                }
                slot[32 - bytes.len()..].copy_from_slice(&bytes);
                Ok(slot)
            } else {
                let v: u128 = s
                    .parse()
                    .map_err(|_| GasFreeError::Other(format!("not an unsigned integer: {}", s)))?;
                slot[16..].copy_from_slice(&v.to_be_bytes());
                Ok(slot)
            }
        }
        other => Err(GasFreeError::Other(format!(
            "cannot encode {} as integer",
            other
        ))),
    }
}

/// Signed integer slot, two's complement sign-extended to 256 bits.
fn encode_int(value: &Value) -> Result<[u8; 32]> {
    let v: i128 = match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .ok_or_else(|| GasFreeError::Other(format!("not an integer: {}", n)))?,
        Value::String(s) if !s.starts_with("0x") => s
            .parse()
            .map_err(|_| GasFreeError::Other(format!("not an integer: {}", s)))?,
        other => return encode_uint(other),
    };
    let mut slot = if v < 0 { [0xffu8; 32] } else { [0u8; 32] };
    slot[16..].copy_from_slice(&v.to_be_bytes());
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_types() -> TypeMap {
        let mut types = TypeMap::new();
        types.insert(
            "Person".into(),
            vec![
                TypedDataField::new("name", "string"),
                TypedDataField::new("wallet", "address"),
            ],
        );
        types.insert(
            "Mail".into(),
            vec![
                TypedDataField::new("from", "Person"),
                TypedDataField::new("to", "Person"),
                TypedDataField::new("contents", "string"),
            ],
        );
        types
    }

    #[test]
    fn test_encode_type_canonical_order() {
        let types = mail_types();
        assert_eq!(
            encode_type(&types, "Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_encode_type_sorts_dependencies() {
        let mut types = TypeMap::new();
        types.insert(
            "Order".into(),
            vec![
                TypedDataField::new("maker", "Zeta"),
                TypedDataField::new("legs", "Alpha[]"),
            ],
        );
        types.insert("Zeta".into(), vec![TypedDataField::new("id", "uint256")]);
        types.insert("Alpha".into(), vec![TypedDataField::new("id", "uint256")]);
        // Dependencies sorted ascending regardless of reference order
        assert_eq!(
            encode_type(&types, "Order").unwrap(),
            "Order(Zeta maker,Alpha[] legs)Alpha(uint256 id)Zeta(uint256 id)"
        );
    }

    #[test]
    fn test_encode_type_stable_across_calls() {
        let types = mail_types();
        let first = encode_type(&types, "Mail").unwrap();
        for _ in 0..10 {
            assert_eq!(encode_type(&types, "Mail").unwrap(), first);
        }
    }

    #[test]
    fn test_encode_type_unknown_primary() {
        let types = mail_types();
        assert!(matches!(
            encode_type(&types, "Nope"),
            Err(GasFreeError::UnknownType(_))
        ));
    }

    #[test]
    fn test_type_hash_matches_keccak_of_type_string() {
        let types = mail_types();
        let expected = keccak256(
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
                .as_bytes(),
        );
        assert_eq!(type_hash(&types, "Mail").unwrap(), expected);
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let types = mail_types();
        let value = json!({"name": "Cow"});
        let err = encode_data(&types, "Person", &value).unwrap_err();
        assert!(matches!(err, GasFreeError::MissingField(ref f) if f == "Person.wallet"));
    }

    #[test]
    fn test_null_field_is_fatal() {
        let types = mail_types();
        let value = json!({"name": "Cow", "wallet": null});
        assert!(matches!(
            encode_data(&types, "Person", &value),
            Err(GasFreeError::MissingField(_))
        ));
    }

    #[test]
    fn test_unknown_field_type_falls_through_to_integer() {
        let types = TypeMap::new();
        let slot = encode_field(&types, "uint48", &json!(42)).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 42;
        assert_eq!(slot, expected);
    }

    #[test]
    fn test_address_slot_is_padded_20_bytes() {
        let types = TypeMap::new();
        let slot =
            encode_field(&types, "address", &json!("TRANp1sx5NdxVE1Uoo3kmpYY23F9X8J5st"))
                .unwrap();
        assert_eq!(&slot[..12], &[0u8; 12]);
        assert_eq!(&slot[12..], &[0xa6u8; 20]);
    }

    #[test]
    fn test_trc_token_encodes_as_integer() {
        let types = TypeMap::new();
        let slot = encode_field(&types, "trcToken", &json!("1002000")).unwrap();
        assert_eq!(slot, encode_uint(&json!(1_002_000u64)).unwrap());
    }

    #[test]
    fn test_uint_accepts_decimal_and_hex_strings() {
        assert_eq!(
            encode_uint(&json!("255")).unwrap(),
            encode_uint(&json!("0xff")).unwrap()
        );
        assert_eq!(
            encode_uint(&json!(255u64)).unwrap(),
            encode_uint(&json!("0xff")).unwrap()
        );
    }

    #[test]
    fn test_int_sign_extension() {
        let slot = encode_int(&json!(-1)).unwrap();
        assert_eq!(slot, [0xffu8; 32]);
    }

    #[test]
    fn test_bool_slot() {
        let types = TypeMap::new();
        let slot = encode_field(&types, "bool", &json!(true)).unwrap();
        assert_eq!(slot[31], 1);
        assert_eq!(&slot[..31], &[0u8; 31]);
    }

    #[test]
    fn test_array_of_structs_hashes_each_element() {
        let mut types = TypeMap::new();
        types.insert("Item".into(), vec![TypedDataField::new("id", "uint256")]);
        let a = json!({"id": 1});
        let b = json!({"id": 2});
        let slot = encode_field(&types, "Item[]", &json!([a, b])).unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(&hash_struct(&types, "Item", &json!({"id": 1})).unwrap());
        buf.extend_from_slice(&hash_struct(&types, "Item", &json!({"id": 2})).unwrap());
        assert_eq!(slot, keccak256(&buf));
    }

    // Standard typed-data example with published expected hashes.
    #[test]
    fn test_reference_vector() {
        let data = include_str!("../../../tests/vectors/typed_data.json");
        let vector: serde_json::Value = serde_json::from_str(data).unwrap();

        let types: TypeMap = serde_json::from_value(vector["types"].clone()).unwrap();
        let domain: TypedDataDomain =
            serde_json::from_value(vector["domain"].clone()).unwrap();
        let message = vector["message"].clone();

        assert_eq!(
            format!("0x{}", hex::encode(domain.separator().unwrap())),
            vector["expected"]["domainSeparator"].as_str().unwrap()
        );
        assert_eq!(
            format!(
                "0x{}",
                hex::encode(hash_struct(&types, "Mail", &message).unwrap())
            ),
            vector["expected"]["messageHash"].as_str().unwrap()
        );
        assert_eq!(
            format!(
                "0x{}",
                hex::encode(signing_digest(&domain, &types, "Mail", &message).unwrap())
            ),
            vector["expected"]["digest"].as_str().unwrap()
        );
    }
}
