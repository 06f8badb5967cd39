use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 over the canonical JSON form of a record.
///
/// Canonical form means object keys in sorted order at every nesting level
/// (serde_json maps are BTreeMaps), so two semantically identical records
/// always produce the same digest regardless of field declaration order.
/// Used for transaction integrity hashes and block-to-block linkage.
pub fn canonical_digest<T: Serialize>(record: &T) -> String {
    let value = serde_json::to_value(record).expect("record serializes to JSON");
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::canonical_digest;

    #[test]
    fn digest_is_stable() {
        let v: serde_json::Value = serde_json::json!({"a": 1, "b": "x"});
        assert_eq!(canonical_digest(&v), canonical_digest(&v));
    }

    #[test]
    fn digest_ignores_key_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x":1,"y":2,"z":[{"k":1,"j":2}]}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"z":[{"j":2,"k":1}],"y":2,"x":1}"#).unwrap();
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn digest_changes_with_content() {
        let a = serde_json::json!({"amount": 10});
        let b = serde_json::json!({"amount": 11});
        assert_ne!(canonical_digest(&a), canonical_digest(&b));
    }
}
