//! SHA-256 and canonical JSON helpers.
//!
//! Archived payloads, signatures, and audit snapshots are hashed over their
//! canonical JSON form: object keys sorted recursively, no insignificant
//! whitespace. The same logical payload therefore always produces the same
//! digest, independent of field declaration order.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Recursively sort object keys.
#[must_use]
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}

/// Serialize any value to its canonical JSON string.
///
/// # Errors
///
/// Returns `serde_json::Error` if the value cannot be represented as JSON
/// (e.g., a map with non-string keys).
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let a = json!({"b": 1, "a": {"z": true, "y": [ {"k": 2, "j": 1} ]}});
        let out = canonical_json(&a).unwrap();
        assert_eq!(out, r#"{"a":{"y":[{"j":1,"k":2}],"z":true},"b":1}"#);
    }

    #[test]
    fn canonical_json_is_order_independent() {
        #[derive(Serialize)]
        struct Forward {
            total: u32,
            customer: &'static str,
        }
        let map = json!({"customer": "ACME", "total": 100});
        assert_eq!(
            canonical_json(&Forward {
                total: 100,
                customer: "ACME"
            })
            .unwrap(),
            canonical_json(&map).unwrap()
        );
    }
}
