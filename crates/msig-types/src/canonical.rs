//! Deterministic signed-byte derivation for envelopes.
//!
//! Every signer in a multi-signature envelope signs the **same** bytes: the
//! envelope serialized with keys in lexicographic order, minus the signature
//! bookkeeping fields and minus any field whose value is null. The optional
//! domain-separation `prefix` is a separate byte string joined in front of
//! the serialized payload; ETH-style `\x19…` separators are the caller's
//! responsibility via that prefix.
//!
//! Any drift in this derivation breaks cross-stack signature validity, so it
//! is kept as a pure function of the envelope value with exhaustive tests.

use serde_json::{Map, Value};

use crate::error::AuthError;

/// Envelope fields excluded from the signed bytes.
const EXCLUDED_FIELDS: [&str; 3] = ["signature", "signatures", "prefix"];

/// Serializes an envelope value into its canonical payload bytes.
///
/// The top-level `signature`, `signatures`, and `prefix` fields are removed,
/// null values are dropped at every depth, and object keys serialize in
/// lexicographic order. Array order is preserved.
///
/// # Example
///
/// ```
/// use msig_types::canonical::canonical_payload;
/// use serde_json::json;
///
/// let envelope = json!({
///     "uniqueKey": "txn-1",
///     "amount": 5,
///     "signatures": [{"signature": "00"}],
///     "memo": null,
/// });
/// let bytes = canonical_payload(&envelope).unwrap();
/// assert_eq!(bytes, br#"{"amount":5,"uniqueKey":"txn-1"}"#);
/// ```
pub fn canonical_payload(envelope: &Value) -> Result<Vec<u8>, AuthError> {
    let object = envelope
        .as_object()
        .ok_or_else(|| AuthError::validation("envelope must be a JSON object"))?;
    let mut canonical = Map::new();
    for (key, value) in object {
        if EXCLUDED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if let Some(value) = strip_nulls(value) {
            canonical.insert(key.clone(), value);
        }
    }
    // serde_json objects are BTreeMap-backed, so keys serialize sorted.
    Ok(serde_json::to_vec(&Value::Object(canonical))?)
}

/// Joins the domain-separation prefix in front of the canonical payload.
///
/// This is the message every scheme signs and verifies.
pub fn signed_bytes(envelope: &Value, prefix: Option<&str>) -> Result<Vec<u8>, AuthError> {
    let payload = canonical_payload(envelope)?;
    match prefix {
        Some(prefix) => {
            let mut bytes = Vec::with_capacity(prefix.len() + payload.len());
            bytes.extend_from_slice(prefix.as_bytes());
            bytes.extend_from_slice(&payload);
            Ok(bytes)
        }
        None => Ok(payload),
    }
}

fn strip_nulls(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(object) => {
            let mut stripped = Map::new();
            for (key, value) in object {
                if let Some(value) = strip_nulls(value) {
                    stripped.insert(key.clone(), value);
                }
            }
            Some(Value::Object(stripped))
        }
        Value::Array(items) => Some(Value::Array(
            // Nulls inside arrays are positional and stay.
            items
                .iter()
                .map(|item| strip_nulls(item).unwrap_or(Value::Null))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sort_lexicographically() {
        let envelope = json!({"zebra": 1, "alpha": 2, "mid": 3});
        let bytes = canonical_payload(&envelope).unwrap();
        assert_eq!(bytes, br#"{"alpha":2,"mid":3,"zebra":1}"#);
    }

    #[test]
    fn test_signature_fields_and_prefix_are_excluded() {
        let envelope = json!({
            "signature": "aa",
            "signatures": [{"signature": "bb"}],
            "prefix": "\u{19}ledger:",
            "uniqueKey": "k",
        });
        let bytes = canonical_payload(&envelope).unwrap();
        assert_eq!(bytes, br#"{"uniqueKey":"k"}"#);
    }

    #[test]
    fn test_nulls_are_omitted_at_every_depth() {
        let envelope = json!({
            "top": null,
            "nested": {"keep": 1, "drop": null, "deeper": {"gone": null}},
        });
        let bytes = canonical_payload(&envelope).unwrap();
        assert_eq!(bytes, br#"{"nested":{"deeper":{},"keep":1}}"#);
    }

    #[test]
    fn test_array_order_and_positional_nulls_are_preserved() {
        let envelope = json!({"items": [3, null, {"b": 2, "a": 1}]});
        let bytes = canonical_payload(&envelope).unwrap();
        assert_eq!(bytes, br#"{"items":[3,null,{"a":1,"b":2}]}"#);
    }

    #[test]
    fn test_nested_objects_sort_too() {
        let envelope = json!({"outer": {"z": 1, "a": {"y": 2, "b": 3}}});
        let bytes = canonical_payload(&envelope).unwrap();
        assert_eq!(bytes, br#"{"outer":{"a":{"b":3,"y":2},"z":1}}"#);
    }

    #[test]
    fn test_prefix_joins_in_front() {
        let envelope = json!({"uniqueKey": "k"});
        let bytes = signed_bytes(&envelope, Some("dex:")).unwrap();
        assert_eq!(bytes, br#"dex:{"uniqueKey":"k"}"#);
        let unprefixed = signed_bytes(&envelope, None).unwrap();
        assert_eq!(unprefixed, br#"{"uniqueKey":"k"}"#);
    }

    #[test]
    fn test_identical_payloads_canonicalize_identically() {
        let a = json!({"b": 1, "a": [true, "x"], "signing": "ETH"});
        let b = json!({"a": [true, "x"], "signing": "ETH", "b": 1, "memo": null});
        assert_eq!(
            canonical_payload(&a).unwrap(),
            canonical_payload(&b).unwrap()
        );
    }

    #[test]
    fn test_non_object_envelope_is_rejected() {
        assert!(canonical_payload(&json!([1, 2])).is_err());
        assert!(canonical_payload(&json!("just a string")).is_err());
    }
}
